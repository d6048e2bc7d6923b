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

use data::game_states::game_state::GameState;
use data::game_states::phase::GamePhase;

/// Normalizes field combinations that should be logically impossible but
/// could appear after a prior bug wrote them to disk. Called once on every
/// load; never during normal operation. Healing is silent to callers but
/// logged, since a healed snapshot means something upstream of here already
/// went wrong.
pub fn heal(state: &mut GameState) {
    if state.drawn_card.is_some() && matches!(state.phase, GamePhase::KingViewPhase | GamePhase::KingSwapPhase) {
        tracing::warn!(game_id = ?state.id, "healing: drawn card present during a King phase");
        state.drawn_card = None;
    }

    if state.special_action.is_some() && state.phase != GamePhase::WaitingForSpecialAction {
        tracing::warn!(game_id = ?state.id, "healing: special action bookkeeping outside WaitingForSpecialAction");
        state.special_action = None;
    }

    if state.king_view.is_some()
        && !matches!(state.phase, GamePhase::KingViewPhase | GamePhase::KingSwapPhase)
    {
        tracing::warn!(game_id = ?state.id, "healing: king-view bookkeeping outside a King phase");
        state.king_view = None;
    }

    if state.winner.is_some() && state.phase != GamePhase::Ended {
        tracing::warn!(game_id = ?state.id, "healing: winner set before the game ended");
        state.winner = None;
    }

    if state.current_player_index >= state.players.len().max(1) {
        tracing::warn!(game_id = ?state.id, "healing: current_player_index out of range");
        state.current_player_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use data::cards::card::Card;
    use data::cards::deck::Deck;
    use data::core::primitives::GameId;
    use data::game_states::game_state::{GameConfiguration, GameHistory};
    use data::game_states::timers::Timers;
    use data::game_states::visibility::VisibilityMap;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::*;

    fn base_state() -> GameState {
        GameState {
            id: GameId::new(),
            phase: GamePhase::KingViewPhase,
            configuration: GameConfiguration::default(),
            players: Vec::new(),
            current_player_index: 0,
            deck: Deck::default(),
            discard_pile: Vec::new(),
            drawn_card: Some(Card::joker()),
            stack_caller: None,
            special_action: None,
            king_view: None,
            end_caller: None,
            final_round_started: false,
            winner: None,
            timers: Timers::default(),
            visibility: VisibilityMap::default(),
            history: GameHistory::new(32),
            rng: Xoshiro256StarStar::seed_from_u64(1),
        }
    }

    #[test]
    fn clears_drawn_card_during_king_phase() {
        let mut state = base_state();
        heal(&mut state);
        assert!(state.drawn_card.is_none());
    }

    #[test]
    fn leaves_valid_state_untouched() {
        let mut state = base_state();
        state.phase = GamePhase::Playing;
        heal(&mut state);
        assert!(state.drawn_card.is_some());
    }
}
