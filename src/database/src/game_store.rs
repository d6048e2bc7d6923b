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
use data::game_states::game_state::GameState;

/// Durable, atomic snapshot storage for one room's game. A snapshot write is
/// all-or-nothing: a reader never observes a partially-written game.
/// `list_active` is used by idle-room garbage collection, which lives
/// outside this crate.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Atomically persists `state` under `room`. Overwrites any previous
    /// snapshot for the same room.
    async fn snapshot(&self, room: &RoomCode, state: &GameState) -> Result<()>;

    /// Loads the most recent snapshot for `room`, healing any
    /// logically-impossible field combinations before returning it. Returns
    /// `None` if no snapshot has ever been written, or it has expired.
    async fn load(&self, room: &RoomCode) -> Result<Option<GameState>>;

    /// Enumerates rooms with a live (non-expired, non-`Ended`) snapshot.
    async fn list_active(&self) -> Result<Vec<RoomCode>>;

    /// Removes a room's snapshot entirely, e.g. after post-`Ended` cleanup.
    async fn delete(&self, room: &RoomCode) -> Result<()>;
}
