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

//! Durable storage for game snapshots, the per-room event stream, and
//! room-wide checkpoints, all backed by a single embedded `sled` database.

pub mod checkpoint;
pub mod event_stream;
pub mod game_store;
pub mod heal;
pub mod sled_store;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use event_stream::EventStream;
pub use game_store::GameStore;
pub use sled_store::SledStore;
