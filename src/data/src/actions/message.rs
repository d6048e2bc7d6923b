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

use serde::{Deserialize, Serialize};

use crate::core::primitives::{PlayerId, TimerId};

/// An action a player has requested the Engine take. Carries no session or
/// transport information; the Orchestrator is responsible for attaching the
/// originating [PlayerId] when it builds an [EngineMessage].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerIntent {
    DrawCard,
    PlayDrawnCard,
    ReplaceAndPlay { hand_index: usize },
    CallStack,
    ExecuteStack { card_index: usize, target: Option<PlayerId> },
    CallCabo,
    ViewOwnCard { card_index: usize },
    ViewOpponentCard { target: PlayerId, card_index: usize },
    SwapCards { own_index: usize, target: PlayerId, target_index: usize },
    KingViewCard { target: PlayerId, card_index: usize },
    KingSwapCards { own_index: usize, target: PlayerId, target_index: usize },
    KingSkipSwap,
}

/// A message the Engine itself schedules, either because a timer elapsed or
/// because a handler enqueued a follow-up (e.g. `NEXT_TURN` after a
/// successful stack resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemIntent {
    SetupTimeout { timer: TimerId },
    StackTimeout { timer: TimerId },
    SpecialActionTimeout { timer: TimerId },
    TurnTransitionTimeout { timer: TimerId },
    NextTurn,
    EndGame,
}

/// The single message type accepted by [crate::game_states::game_state::GameState]'s
/// step function. Every call into the Engine is one of these, tagged with
/// who (if anyone) originated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineMessage {
    Player { player: PlayerId, intent: PlayerIntent },
    System(SystemIntent),
}

impl EngineMessage {
    pub fn player(player: PlayerId, intent: PlayerIntent) -> Self {
        Self::Player { player, intent }
    }

    pub fn system(intent: SystemIntent) -> Self {
        Self::System(intent)
    }

    /// The player this message claims to originate from, if any. System
    /// messages have no originator.
    pub fn originator(&self) -> Option<PlayerId> {
        match self {
            Self::Player { player, .. } => Some(*player),
            Self::System(_) => None,
        }
    }
}
