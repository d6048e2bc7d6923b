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

//! The real-time game server: a room loop per active game, a broadcast
//! pump that fans out redacted events, and a connection manager that
//! tracks session/connection identity across reconnects. See
//! [orchestrator] for the room loop, [broadcast] for event fan-out, and
//! [ws] for the WebSocket edge.

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod name_service;
pub mod orchestrator;
pub mod rooms;
pub mod ws;
