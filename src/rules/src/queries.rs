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

//! Read-only helpers over [GameState], shared by several action handlers.

use data::core::primitives::PlayerId;
use data::game_states::game_state::GameState;
use data::game_states::player_state::PlayerState;

pub fn is_current_player(game: &GameState, player: PlayerId) -> bool {
    game.current_player_id() == player
}

pub fn hand_index_in_range(player: &PlayerState, index: usize) -> bool {
    index < player.hand.len()
}

/// True once a played card exists for players to react to, i.e. the discard
/// pile is non-empty.
pub fn has_played_card(game: &GameState) -> bool {
    game.played_card().is_some()
}
