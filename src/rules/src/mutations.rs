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

//! Small, reusable state mutations shared by several action handlers. None
//! of these validate anything; callers are expected to have already
//! checked legality.

use chrono::{DateTime, Utc};
use data::core::primitives::PlayerId;
use data::events::event::{EventKind, GameEvent};
use data::game_states::game_state::GameState;
use data::game_states::phase::GamePhase;
use data::game_states::timers::ArmedTimer;

pub const SPECIAL_ACTION_TIMEOUT_SECS: i64 = 30;
pub const STACK_TIMEOUT_SECS: i64 = 30;
pub const TURN_TRANSITION_TIMEOUT_SECS: i64 = 5;
pub const SETUP_TIMEOUT_SECS: i64 = 10;

pub fn push_event(events: &mut Vec<GameEvent>, kind: EventKind, now: DateTime<Utc>) {
    events.push(GameEvent::new(kind, now));
}

/// Exchanges the cards at two (possibly identical) hand slots. Visibility
/// entries are never touched here: they are indexed by slot, not by card
/// identity, so a swap silently carries a viewer's knowledge along with
/// whichever slot they were watching.
pub fn swap_hand_slots(
    game: &mut GameState,
    owner_a: PlayerId,
    index_a: usize,
    owner_b: PlayerId,
    index_b: usize,
) {
    if owner_a == owner_b {
        let hand = &mut game.player_mut(owner_a).expect("owner exists").hand;
        hand.swap(index_a, index_b);
        return;
    }
    let card_a = game.player(owner_a).expect("owner exists").hand[index_a];
    let card_b = game.player(owner_b).expect("owner exists").hand[index_b];
    game.player_mut(owner_a).expect("owner exists").hand[index_a] = card_b;
    game.player_mut(owner_b).expect("owner exists").hand[index_b] = card_a;
}

/// Clears the bookkeeping for an in-progress special action or King
/// view/swap sequence, including its shared timer slot.
pub fn clear_special_action(game: &mut GameState) {
    game.special_action = None;
    game.king_view = None;
    game.timers.special_action = None;
}

/// Resolves what happens immediately after a special action, King sequence,
/// or non-special play finishes: if someone has already called stack during
/// that window, the stack resolution phase begins instead of the ordinary
/// turn-transition countdown.
pub fn enter_stack_or_turn_transition(game: &mut GameState, now: DateTime<Utc>) {
    if game.stack_caller.is_some() {
        game.phase = GamePhase::StackCalled;
        game.timers.stack = Some(ArmedTimer::arm(now, chrono::Duration::seconds(STACK_TIMEOUT_SECS)));
    } else {
        game.phase = GamePhase::TurnTransition;
        game.timers.turn_transition =
            Some(ArmedTimer::arm(now, chrono::Duration::seconds(TURN_TRANSITION_TIMEOUT_SECS)));
    }
}
