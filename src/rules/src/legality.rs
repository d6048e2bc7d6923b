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

//! Named legality predicates used by [crate::engine] handlers via the
//! `verify!` macro. Kept separate from the handlers themselves so the
//! validation rules read as a checklist independent of their effects.

use data::core::primitives::PlayerId;
use data::game_states::game_state::GameState;

/// A player may call stack whenever a card has been played and no one has
/// claimed the stack yet. Calling from an illegal phase (e.g. before any
/// card has ever been played) is already excluded by `has_played_card`.
pub fn can_call_stack(game: &GameState) -> bool {
    game.played_card().is_some() && game.stack_caller.is_none()
}

/// Only the player who first called stack may execute it.
pub fn is_stack_caller(game: &GameState, player: PlayerId) -> bool {
    game.stack_caller == Some(player)
}

/// A target for `view_opponent` / `swap_cards` / `execute_stack` must name
/// someone other than the actor and must be seated in the game.
pub fn is_valid_opponent_target(game: &GameState, actor: PlayerId, target: PlayerId) -> bool {
    actor != target && game.player(target).is_some()
}
