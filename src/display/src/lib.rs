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

//! Per-viewer redaction of [data::game_states::game_state::GameState] and
//! [data::events::event::GameEvent] into wire-safe views, plus the
//! WebSocket envelope types exchanged with clients.

pub mod core;
pub mod protocol;
pub mod rendering;
