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
use data::core::primitives::{PlayerId, RoomCode, UserId};
use data::rooms::room::{Room, RoomPhase};
use serde::{Deserialize, Serialize};

use crate::core::event_view::RedactedEvent;
use crate::core::game_view::GameView;

/// WebSocket close code used when a connection has no valid session.
pub const CLOSE_UNAUTHORIZED: u16 = 4001;
/// WebSocket close code used when an action requires a room the session
/// has not joined.
pub const CLOSE_NOT_IN_ROOM: u16 = 4003;
/// WebSocket close code used when a game action arrives for a room with no
/// active game.
pub const CLOSE_GAME_NOT_ACTIVE: u16 = 4004;

/// Everything the server may send over the WebSocket. `GameEvent` and
/// `GameCheckpoint` are built fresh per recipient (see
/// [crate::core::event_view::redact] and [crate::rendering::sync::build]);
/// the rest are lobby/control messages shared verbatim across a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameEvent {
        seq_num: u64,
        stream_id: u64,
        #[serde(flatten)]
        event: RedactedEvent,
        timestamp: DateTime<Utc>,
    },
    GameCheckpoint {
        seq_num: u64,
        view: GameView,
    },
    PlayerJoined {
        player_id: PlayerId,
        display_name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    RoomUpdate {
        room: RoomSummary,
    },
    SessionInfo {
        user_id: UserId,
        nickname: String,
        room: Option<RoomCode>,
        is_host: bool,
    },
    Ready {
        current_seq: u64,
    },
    Pong,
    Error {
        message: String,
    },
    Ping,
}

impl ServerMessage {
    /// The sequence number this message carries, for outbox bookkeeping.
    /// Lobby/control messages carry none.
    pub fn seq_num(&self) -> Option<u64> {
        match self {
            Self::GameEvent { seq_num, .. } | Self::GameCheckpoint { seq_num, .. } => Some(*seq_num),
            _ => None,
        }
    }
}

/// Public view of a [Room], omitting nothing sensitive: room membership has
/// no secrets, unlike hand contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub host: PlayerId,
    pub phase: RoomPhase,
    pub members: Vec<RoomMemberSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMemberSummary {
    pub id: PlayerId,
    pub display_name: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host: room.host,
            phase: room.phase,
            members: room
                .members
                .iter()
                .map(|m| RoomMemberSummary { id: m.id, display_name: m.display_name.clone() })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_event_serializes_with_flattened_event_fields() {
        let msg = ServerMessage::GameEvent {
            seq_num: 1,
            stream_id: 7,
            event: RedactedEvent::CardDrawn { player: PlayerId::new() },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "game_event");
        assert_eq!(json["event_type"], "card_drawn");
        assert!(json.get("data").is_some());
    }

    #[test]
    fn ping_serializes_as_bare_type_tag() {
        let json = serde_json::to_value(ServerMessage::Ping).unwrap();
        assert_eq!(json["type"], "ping");
    }
}
