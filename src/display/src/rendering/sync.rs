// Copyright © cabo 2024-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use data::core::primitives::PlayerId;
use data::game_states::game_state::GameState;
use data::game_states::visibility::Slot;

use crate::core::card_view::CardView;
use crate::core::game_view::{GameView, PlayerView};

/// Converts a [GameState] into a [GameView] redacted for `viewer`: every
/// hand slot `viewer` is not currently permitted to see (per
/// [data::game_states::visibility::VisibilityMap]) comes back with `card:
/// None`, and the drawn card is included only if `viewer` is the current
/// player.
pub fn build(game: &GameState, viewer: PlayerId) -> GameView {
    let current_player = game.current_player_id();
    GameView {
        game_id: game.id,
        phase: game.phase,
        viewer,
        current_player,
        your_turn: current_player == viewer,
        players: game.players.iter().map(|player| player_view(game, viewer, player)).collect(),
        deck_count: game.deck.len(),
        discard_top: game.played_card(),
        drawn_card: if current_player == viewer { game.drawn_card } else { None },
        stack_caller: game.stack_caller,
        end_caller: game.end_caller,
        winner: game.winner,
    }
}

fn player_view(
    game: &GameState,
    viewer: PlayerId,
    player: &data::game_states::player_state::PlayerState,
) -> PlayerView {
    let hand = player
        .hand
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let visible = game.visibility.can_see(viewer, Slot::new(player.id, index));
            CardView::new(index, *card, visible)
        })
        .collect();
    PlayerView {
        id: player.id,
        display_name: player.display_name.clone(),
        hand_size: player.hand.len(),
        hand,
        called_cabo: player.called_cabo,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use data::core::primitives::{GameId, PlayerId};
    use data::game_states::game_state::GameConfiguration;

    use super::*;

    #[test]
    fn hides_undiscovered_slots_from_non_owner() {
        let p1 = PlayerId::new();
        let p2 = PlayerId::new();
        let game = rules::new_game::create(
            GameId::new(),
            vec![(p1, "One".to_string()), (p2, "Two".to_string())],
            GameConfiguration::default(),
            Some(42),
            Utc::now(),
        );

        let view = build(&game, p1);
        let p2_view = view.players.iter().find(|p| p.id == p2).unwrap();
        assert!(p2_view.hand.iter().all(|c| c.card.is_none()));

        let p1_view = view.players.iter().find(|p| p.id == p1).unwrap();
        assert!(p1_view.hand[0].card.is_some());
        assert!(p1_view.hand[1].card.is_some());
        assert!(p1_view.hand[2].card.is_none());
    }

    #[test]
    fn drawn_card_visible_only_to_drawer() {
        let p1 = PlayerId::new();
        let p2 = PlayerId::new();
        let mut game = rules::new_game::create(
            GameId::new(),
            vec![(p1, "One".to_string()), (p2, "Two".to_string())],
            GameConfiguration::default(),
            Some(42),
            Utc::now(),
        );
        game.current_player_index = 0;
        game.drawn_card = game.deck.draw();

        assert!(build(&game, p1).drawn_card.is_some());
        assert!(build(&game, p2).drawn_card.is_none());
    }
}
