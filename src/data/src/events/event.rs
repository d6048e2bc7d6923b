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
use serde::{Deserialize, Serialize};

use crate::cards::card::Card;
use crate::core::primitives::PlayerId;

/// One outcome of a successfully-processed [crate::actions::message::EngineMessage].
/// Payloads always carry the raw card; redaction for a particular viewer
/// happens downstream, never here, because the Engine has no notion of
/// "the current recipient".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    GameStarted { starting_player: PlayerId },
    CardDrawn { player: PlayerId },
    CardPlayed { player: PlayerId, card: Card },
    CardReplacedAndPlayed { player: PlayerId, hand_index: usize, card: Card },
    StackCalled { caller: PlayerId },
    StackSuccess { caller: PlayerId, self_stack: bool, card: Card, target: Option<PlayerId> },
    StackFailed { caller: PlayerId, penalty_card: Option<Card> },
    StackTimeout { caller: PlayerId, penalty_card: Option<Card> },
    CaboCalled { player: PlayerId },
    TurnChanged { player: PlayerId },
    GamePhaseChanged { phase: String },
    CardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Card },
    OpponentCardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Card },
    CardsSwapped { initiator: PlayerId, own_index: usize, target: PlayerId, target_index: usize },
    KingCardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Card },
    KingCardsSwapped { initiator: PlayerId, own_index: usize, target: PlayerId, target_index: usize },
    KingSwapSkipped { player: PlayerId },
    SpecialActionTimeout { player: PlayerId },
    GameEnded { final_scores: Vec<(PlayerId, i32)>, winner: PlayerId },
}

/// A single event emitted by the Engine, with the wall-clock time it was
/// produced. The Orchestrator appends these, in order, to a room's event
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl GameEvent {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }
}
