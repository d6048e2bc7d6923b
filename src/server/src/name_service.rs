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

//! The external name service: relational persistence of users, room
//! membership, and idle-room garbage collection. Explicitly out of scope
//! for this crate's own implementation; consumed here only through this
//! trait, with HTTP endpoints, auth cookie handling, and schema migrations
//! all living outside the core.

use async_trait::async_trait;
use color_eyre::Result;
use data::core::primitives::{PlayerId, RoomCode};
use dashmap::DashMap;

/// Membership lookup and last-activity touch, the only two things the core
/// consumes from the name service.
#[async_trait]
pub trait NameService: Send + Sync {
    /// The display name registered for `player`, if the name service knows
    /// one.
    async fn nickname(&self, player: PlayerId) -> Result<Option<String>>;

    /// Records that `room` had activity just now, for the name service's
    /// own idle-room cleanup to consult.
    async fn touch_room_activity(&self, room: &RoomCode) -> Result<()>;
}

/// An in-memory stand-in for the real relational name service, used in
/// tests and for local runs without an external dependency.
#[derive(Debug, Default)]
pub struct InMemoryNameService {
    nicknames: DashMap<PlayerId, String>,
}

impl InMemoryNameService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_nickname(&self, player: PlayerId, nickname: impl Into<String>) {
        self.nicknames.insert(player, nickname.into());
    }
}

#[async_trait]
impl NameService for InMemoryNameService {
    async fn nickname(&self, player: PlayerId) -> Result<Option<String>> {
        Ok(self.nicknames.get(&player).map(|entry| entry.clone()))
    }

    async fn touch_room_activity(&self, _room: &RoomCode) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_registered_nickname() {
        let service = InMemoryNameService::new();
        let player = PlayerId::new();
        service.set_nickname(player, "Ada");
        assert_eq!(service.nickname(player).await.unwrap(), Some("Ada".to_string()));
    }

    #[tokio::test]
    async fn unknown_player_has_no_nickname() {
        let service = InMemoryNameService::new();
        assert_eq!(service.nickname(PlayerId::new()).await.unwrap(), None);
    }
}
