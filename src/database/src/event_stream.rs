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
use color_eyre::Result;
use data::core::primitives::RoomCode;
use data::events::event::GameEvent;

/// Maximum number of entries retained per room's stream; older entries are
/// trimmed on append.
pub const STREAM_CAP: usize = 1000;

/// Append-only per-room event log. Entries are assigned a store-wide
/// monotonic id at append time; replaying all entries with id strictly
/// greater than a checkpoint's `stream_position` against that checkpoint
/// reproduces the current game state.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Appends `event` to `room`'s stream and returns its assigned id.
    async fn append(&self, room: &RoomCode, event: &GameEvent) -> Result<u64>;

    /// Returns all entries with id strictly greater than `after`, in id
    /// order. Pass `0` to read the entire retained tail.
    async fn read_after(&self, room: &RoomCode, after: u64) -> Result<Vec<(u64, GameEvent)>>;

    /// The id of the most recently appended entry for `room`, or `0` if the
    /// stream is empty.
    async fn latest_id(&self, room: &RoomCode) -> Result<u64>;
}
