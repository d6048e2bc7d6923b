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

#![allow(unused_variables)]

//! The Cabo rules engine: turns [data::actions::message::EngineMessage]s
//! into state transitions, one at a time, via [engine::step] and
//! [engine::process].

pub mod engine;
pub mod legality;
pub mod mutations;
pub mod new_game;
pub mod queries;
