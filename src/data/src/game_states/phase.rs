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

/// The game's top-level state machine phase. Initial: [GamePhase::Setup].
/// Terminal: [GamePhase::Ended].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Setup,
    Playing,
    WaitingForSpecialAction,
    KingViewPhase,
    KingSwapPhase,
    StackCalled,
    TurnTransition,
    Ended,
}

/// The effect a played special card is waiting on a player to resolve.
/// Entered when a 7/8/9/10/J/Q is played; kings instead move straight to
/// [GamePhase::KingViewPhase].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialActionKind {
    /// 7 or 8: the player reveals one of their own cards.
    ViewOwn,
    /// 9 or 10: the player reveals one opponent card.
    ViewOpponent,
    /// Jack or Queen: the player swaps one own card with one opponent card,
    /// blind.
    SwapOpponent,
}
