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

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;

/// Identifies a player across reconnects. The game treats the session id as
/// the player id: there is no separate in-game player identifier.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A long-lived authenticated identity; one per player. Sessions are
/// addressed by [PlayerId].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Six-character alphanumeric room code, e.g. `"K3PQZR"`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RoomCode(pub String);

impl RoomCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates a random code from an alphabet that excludes characters
    /// easily confused when read aloud or displayed in a small font (no
    /// `0`/`O`, `1`/`I`).
    pub fn generate(rng: &mut impl Rng) -> Self {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for one ongoing game within a room. A room hosts at
/// most one game at a time, but games are identified independently of rooms
/// so that a durable snapshot unambiguously refers to a single game
/// instance even across a room being reused.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier for a single armed timer. Stable across the lifetime of
/// that timer; a timeout message carrying a stale id (one that no longer
/// matches the state field that armed it) is inert.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub Uuid);

impl TimerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::*;

    #[test]
    fn room_code_has_expected_length_and_alphabet() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        let code = RoomCode::generate(&mut rng);
        assert_eq!(code.0.len(), ROOM_CODE_LEN);
        assert!(code.0.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(PlayerId::new(), PlayerId::new());
        assert_ne!(GameId::new(), GameId::new());
        assert_ne!(TimerId::new(), TimerId::new());
    }
}
