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

use chrono::{DateTime, Utc};
use data::cards::deck::Deck;
use data::core::primitives::{GameId, PlayerId};
use data::game_states::game_state::{GameConfiguration, GameHistory, GameState};
use data::game_states::phase::GamePhase;
use data::game_states::player_state::PlayerState;
use data::game_states::timers::{ArmedTimer, Timers};
use data::game_states::visibility::{Slot, VisibilityMap};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::mutations::SETUP_TIMEOUT_SECS;

const INITIAL_HAND_SIZE: usize = 4;
const HISTORY_CAPACITY: usize = 64;

/// Deals a fresh game into [GamePhase::Setup]: shuffles a new deck, deals
/// `INITIAL_HAND_SIZE` cards to each seat in order, seeds each player's
/// visibility over their own first two cards, and arms the setup timer.
///
/// `seed` fixes the RNG for deterministic tests (see
/// [GameConfiguration::deterministic]); in production this should be
/// `None`, which seeds from OS entropy.
pub fn create(
    id: GameId,
    seats: Vec<(PlayerId, String)>,
    config: GameConfiguration,
    seed: Option<u64>,
    now: DateTime<Utc>,
) -> GameState {
    let mut rng = match seed {
        Some(s) => Xoshiro256StarStar::seed_from_u64(s),
        None => Xoshiro256StarStar::from_entropy(),
    };
    let mut deck = Deck::new_shuffled(&mut rng);

    let mut players = Vec::with_capacity(seats.len());
    for (player_id, display_name) in seats {
        let mut hand = Vec::with_capacity(INITIAL_HAND_SIZE);
        for _ in 0..INITIAL_HAND_SIZE {
            hand.push(deck.draw().expect("a fresh deck holds enough cards for the opening deal"));
        }
        players.push(PlayerState { id: player_id, display_name, hand, called_cabo: false });
    }

    let mut visibility = VisibilityMap::default();
    for player in &players {
        visibility.reveal(player.id, Slot::new(player.id, 0));
        visibility.reveal(player.id, Slot::new(player.id, 1));
    }

    let mut timers = Timers::default();
    timers.setup = Some(ArmedTimer::arm(now, chrono::Duration::seconds(SETUP_TIMEOUT_SECS)));

    GameState {
        id,
        phase: GamePhase::Setup,
        configuration: config,
        players,
        current_player_index: 0,
        deck,
        discard_pile: Vec::new(),
        drawn_card: None,
        stack_caller: None,
        special_action: None,
        king_view: None,
        end_caller: None,
        final_round_started: false,
        winner: None,
        timers,
        visibility,
        history: GameHistory::new(HISTORY_CAPACITY),
        rng,
    }
}

#[cfg(test)]
mod tests {
    use data::game_states::visibility::Slot;

    use super::*;

    #[test]
    fn deals_four_cards_and_seeds_visibility() {
        let seats = vec![
            (PlayerId::new(), "P1".to_string()),
            (PlayerId::new(), "P2".to_string()),
            (PlayerId::new(), "P3".to_string()),
        ];
        let ids: Vec<_> = seats.iter().map(|(id, _)| *id).collect();
        let game = create(GameId::new(), seats, GameConfiguration::default(), Some(1), Utc::now());

        assert_eq!(game.phase, GamePhase::Setup);
        assert_eq!(game.deck.len(), 54 - 4 * 3);
        for id in ids {
            assert_eq!(game.player(id).unwrap().hand.len(), INITIAL_HAND_SIZE);
            assert!(game.visibility.can_see(id, Slot::new(id, 0)));
            assert!(game.visibility.can_see(id, Slot::new(id, 1)));
            assert!(!game.visibility.can_see(id, Slot::new(id, 2)));
        }
        assert!(game.timers.setup.is_some());
    }

    #[test]
    fn total_card_count_is_conserved_after_dealing() {
        let seats = vec![(PlayerId::new(), "P1".to_string()), (PlayerId::new(), "P2".to_string())];
        let game = create(GameId::new(), seats, GameConfiguration::default(), Some(1), Utc::now());
        assert_eq!(game.total_card_count(), 54);
    }
}
