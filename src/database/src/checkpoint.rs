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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::Result;
use data::core::primitives::RoomCode;
use data::game_states::game_state::GameState;
use data::game_states::phase::GamePhase;
use serde::{Deserialize, Serialize};

/// A room-wide snapshot of game state tagged with the event-stream position
/// at the time of capture. `stream_position` is the last stream id that was
/// folded into `state`; replaying events strictly after that id against
/// `state` reproduces the live game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub stream_position: u64,
    pub sequence_num: u64,
    pub phase: GamePhase,
    pub state: GameState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn capture(state: &GameState, stream_position: u64, sequence_num: u64, now: DateTime<Utc>) -> Self {
        Self { stream_position, sequence_num, phase: state.phase, state: state.clone(), created_at: now }
    }
}

/// Stores the single latest checkpoint per room. Older checkpoints are not
/// retained; the event stream plus the latest checkpoint is sufficient to
/// reconstruct current state.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn write(&self, room: &RoomCode, checkpoint: &Checkpoint) -> Result<()>;
    async fn latest(&self, room: &RoomCode) -> Result<Option<Checkpoint>>;
}
