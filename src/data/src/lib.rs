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

//! Core data types shared across the Cabo workspace: cards and deck,
//! game-state types, messages, events, and the room/session model. This
//! crate defines data only; the rules for how it evolves live in `rules`.

pub mod actions;
pub mod cards;
pub mod core;
pub mod events;
pub mod game_states;
pub mod rooms;
