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

use crate::core::primitives::{GameId, PlayerId, RoomCode};
use crate::game_states::game_state::GameConfiguration;

/// Lifecycle tag for a room, independent of the `GamePhase` of any game it
/// hosts. A room may cycle through many games while staying `InGame` /
/// `Waiting` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Waiting,
    InGame,
    Finished,
}

/// One seated member of a room. Distinct from [crate::game_states::player_state::PlayerState]:
/// a member exists for the life of the room, a `PlayerState` only for the
/// life of one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMember {
    pub id: PlayerId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// A named collection of up to `config.max_players` players that may host
/// one game at a time. Rooms outlive any single game: the same room code
/// can be reused to start a new game once the previous one ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub host: PlayerId,
    pub phase: RoomPhase,
    pub members: Vec<RoomMember>,
    pub config: GameConfiguration,
    pub active_game: Option<GameId>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(code: RoomCode, host: PlayerId, host_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            code,
            host,
            phase: RoomPhase::Waiting,
            members: vec![RoomMember { id: host, display_name: host_name.into(), joined_at: now }],
            config: GameConfiguration::default(),
            active_game: None,
            last_activity: now,
        }
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn member(&self, id: PlayerId) -> Option<&RoomMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Adds a member if the room has capacity and the player is not already
    /// seated. No-op (returns `false`) otherwise; callers translate that
    /// into a rejection, never an error.
    pub fn add_member(&mut self, id: PlayerId, display_name: impl Into<String>, now: DateTime<Utc>) -> bool {
        if self.is_member(id) || self.members.len() >= self.config.max_players as usize {
            return false;
        }
        self.members.push(RoomMember { id, display_name: display_name.into(), joined_at: now });
        self.last_activity = now;
        true
    }

    /// Removes a member. If the departing member was host, migration picks
    /// the longest-seated remaining member, matching the invariant that a
    /// non-empty room's host always refers to a current member.
    pub fn remove_member(&mut self, id: PlayerId) {
        self.members.retain(|m| m.id != id);
        if self.host == id {
            if let Some(next) = self.members.first() {
                self.host = next.id;
            }
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}
