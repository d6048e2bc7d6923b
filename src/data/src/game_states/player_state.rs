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

use crate::cards::card::Card;
use crate::core::primitives::PlayerId;

/// A single player's state within an ongoing game. Players are created when
/// a room starts a game and destroyed when the game ends or the room is
/// cleaned up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Stable across reconnects; equal to the session id.
    pub id: PlayerId,

    pub display_name: String,

    /// Ordered hand of cards, typically 4 at game start.
    pub hand: Vec<Card>,

    /// Whether this player has called Cabo. Mirrors `game.end_caller ==
    /// Some(self.id)`; kept as its own field because it is part of the
    /// player-visible data model.
    pub called_cabo: bool,
}

impl PlayerState {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self { id, display_name: display_name.into(), hand: Vec::new(), called_cabo: false }
    }
}
