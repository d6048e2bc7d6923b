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

//! Session/connection bookkeeping: heartbeat, grace-period reconnect,
//! per-session outbox, and sequence acknowledgement. Mirrors the registry
//! described for the Connection Manager, backed by in-process concurrent
//! maps rather than an external KV store, since this crate runs as a single
//! process co-located with its durable store.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use data::core::primitives::{PlayerId, RoomCode};
use display::protocol::envelope::ServerMessage;
use serde_json::to_string;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Grace,
}

/// An outbound channel to the task driving one WebSocket's write half. The
/// connection manager only ever hands it serialized JSON text; the
/// transport-specific framing happens at the edge.
pub type OutboundSender = mpsc::UnboundedSender<String>;

struct ConnectionEntry {
    session: PlayerId,
    room: RoomCode,
    display_name: String,
    is_host: bool,
    connected_at: DateTime<Utc>,
    last_ping: DateTime<Utc>,
    last_pong: DateTime<Utc>,
    state: ConnectionState,
    sender: OutboundSender,
}

struct GraceRecord {
    room: RoomCode,
    display_name: String,
    is_host: bool,
    last_ack_seq: u64,
    grace_end: DateTime<Utc>,
}

/// Registration details for a freshly accepted or reconnecting WebSocket.
pub struct Registration {
    pub session: PlayerId,
    pub room: RoomCode,
    pub display_name: String,
    pub is_host: bool,
    pub sender: OutboundSender,
}

pub struct ConnectionManager {
    config: ServerConfig,
    connections: DashMap<ConnectionId, ConnectionEntry>,
    session_to_connection: DashMap<PlayerId, ConnectionId>,
    presence: DashMap<RoomCode, HashSet<PlayerId>>,
    outbox: DashMap<PlayerId, VecDeque<(u64, ServerMessage)>>,
    cursor: DashMap<PlayerId, u64>,
    grace: DashMap<PlayerId, GraceRecord>,
    room_seq: DashMap<RoomCode, u64>,
}

impl ConnectionManager {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            connections: DashMap::new(),
            session_to_connection: DashMap::new(),
            presence: DashMap::new(),
            outbox: DashMap::new(),
            cursor: DashMap::new(),
            grace: DashMap::new(),
            room_seq: DashMap::new(),
        }
    }

    pub fn heartbeat_ping_interval(&self) -> std::time::Duration {
        self.config.heartbeat_ping_interval()
    }

    /// Allocates the next room-scoped sequence number. Called by the
    /// broadcast pump, never directly by handlers.
    pub fn next_seq(&self, room: &RoomCode) -> u64 {
        let mut entry = self.room_seq.entry(room.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// The room's current sequence counter without advancing it. Used when
    /// stamping a checkpoint with the sequence number of the last event
    /// folded into it.
    pub fn current_seq(&self, room: &RoomCode) -> u64 {
        self.room_seq.get(room).map(|e| *e).unwrap_or(0)
    }

    /// Registers a brand-new or reconnecting connection. If an existing
    /// connection for the session is live on a different transport, it is
    /// closed first so at most one active connection per session ever
    /// exists. Returns the new connection id.
    pub fn register(&self, registration: Registration) -> ConnectionId {
        if let Some((_, old_id)) = self.session_to_connection.remove(&registration.session) {
            if let Some((_, old)) = self.connections.remove(&old_id) {
                let _ = old.sender.send(close_frame());
            }
        }
        self.grace.remove(&registration.session);

        let id = ConnectionId::new();
        let now = Utc::now();
        self.connections.insert(
            id,
            ConnectionEntry {
                session: registration.session,
                room: registration.room.clone(),
                display_name: registration.display_name,
                is_host: registration.is_host,
                connected_at: now,
                last_ping: now,
                last_pong: now,
                state: ConnectionState::Active,
                sender: registration.sender,
            },
        );
        self.session_to_connection.insert(registration.session, id);
        self.presence.entry(registration.room).or_default().insert(registration.session);
        id
    }

    /// Resolves the replay resume point for a reconnecting session: the
    /// larger of what the client claims to have seen and what the grace
    /// record (if any) last acknowledged.
    pub fn resume_point(&self, session: PlayerId, client_reported_last_seq: u64) -> u64 {
        match self.grace.get(&session) {
            Some(record) => client_reported_last_seq.max(record.last_ack_seq),
            None => client_reported_last_seq,
        }
    }

    pub fn is_host(&self, session: PlayerId) -> bool {
        self.grace
            .get(&session)
            .map(|r| r.is_host)
            .or_else(|| {
                self.session_to_connection
                    .get(&session)
                    .and_then(|id| self.connections.get(&id).map(|c| c.is_host))
            })
            .unwrap_or(false)
    }

    /// Delivers `msg` to `session`'s live connection if one exists;
    /// otherwise it is dropped from live delivery but still recorded in the
    /// outbox for later replay.
    pub fn send_to_session(&self, session: PlayerId, msg: ServerMessage) {
        if let Some(seq) = msg.seq_num() {
            self.push_outbox(session, seq, msg.clone());
        }
        let Some(connection_id) = self.session_to_connection.get(&session).map(|e| *e) else {
            return;
        };
        let Some(entry) = self.connections.get(&connection_id) else { return };
        if entry.state != ConnectionState::Active {
            return;
        }
        match to_string(&msg) {
            Ok(text) => {
                if entry.sender.send(text).is_err() {
                    debug!(?session, "dropping message to a closed connection sender");
                }
            }
            Err(error) => warn!(?error, "failed to serialize outbound message"),
        }
    }

    fn push_outbox(&self, session: PlayerId, seq: u64, msg: ServerMessage) {
        let mut entry = self.outbox.entry(session).or_default();
        entry.push_back((seq, msg));
        while entry.len() > self.config.outbox_capacity {
            entry.pop_front();
        }
    }

    /// Replays every outbox entry for `session` with sequence strictly
    /// greater than `after`, in order.
    pub fn replay_after(&self, session: PlayerId, after: u64) -> Vec<ServerMessage> {
        self.outbox
            .get(&session)
            .map(|entries| entries.iter().filter(|(seq, _)| *seq > after).map(|(_, msg)| msg.clone()).collect())
            .unwrap_or_default()
    }

    /// The oldest sequence number still held in `session`'s outbox, if any.
    /// A resume point older than this means entries were evicted by the
    /// capacity cap and outbox replay alone would leave a gap.
    pub fn outbox_floor(&self, session: PlayerId) -> Option<u64> {
        self.outbox.get(&session).and_then(|entries| entries.front().map(|(seq, _)| *seq))
    }

    pub fn broadcast_to_room(&self, room: &RoomCode, msg: ServerMessage, exclude: Option<PlayerId>) {
        let Some(members) = self.presence.get(room) else { return };
        for &session in members.iter() {
            if Some(session) == exclude {
                continue;
            }
            self.send_to_session(session, msg.clone());
        }
    }

    /// Monotonically advances `session`'s acknowledged cursor; a
    /// lower-or-equal ack is a no-op.
    pub fn acknowledge(&self, session: PlayerId, seq: u64) {
        let mut entry = self.cursor.entry(session).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }

    pub fn cursor(&self, session: PlayerId) -> u64 {
        self.cursor.get(&session).map(|e| *e).unwrap_or(0)
    }

    pub fn record_ping(&self, connection_id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&connection_id) {
            entry.last_ping = Utc::now();
        }
    }

    pub fn record_pong(&self, connection_id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&connection_id) {
            entry.last_pong = Utc::now();
        }
    }

    /// Same as [Self::record_pong], addressed by session rather than
    /// connection id; used when the pong arrives as an application-level
    /// JSON message rather than a transport-level control frame.
    pub fn record_pong_for_session(&self, session: PlayerId) {
        if let Some(id) = self.session_to_connection.get(&session).map(|e| *e) {
            self.record_pong(id);
        }
    }

    /// Connections whose last pong is older than `heartbeat_ping_timeout`.
    pub fn stale_connections(&self) -> Vec<ConnectionId> {
        let timeout = chrono::Duration::from_std(self.config.heartbeat_ping_timeout())
            .expect("configured timeout fits in chrono::Duration");
        let now = Utc::now();
        self.connections
            .iter()
            .filter(|entry| now - entry.last_pong > timeout)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Tears down a connection. If `enter_grace` is set and the connection
    /// was active, a grace record is written preserving the session's room
    /// seat, and `player_left` is broadcast to the rest of the room. A
    /// grace session is deliberately left in `presence` — it is still a
    /// room member as far as the broadcast pump is concerned, just one
    /// with no live connection, so `send_to_session` keeps appending to
    /// its outbox for replay on reconnect (see [Self::expire_grace] for
    /// the eventual full removal).
    pub fn disconnect(&self, connection_id: ConnectionId, enter_grace: bool) {
        let Some((_, entry)) = self.connections.remove(&connection_id) else { return };
        if self.session_to_connection.get(&entry.session).map(|id| *id) == Some(connection_id) {
            self.session_to_connection.remove(&entry.session);
        }

        let entered_grace = enter_grace && entry.state == ConnectionState::Active;
        if !entered_grace {
            if let Some(mut members) = self.presence.get_mut(&entry.room) {
                members.remove(&entry.session);
            }
            return;
        }

        let grace_end = Utc::now() + self.config.grace_period();
        self.grace.insert(
            entry.session,
            GraceRecord {
                room: entry.room.clone(),
                display_name: entry.display_name.clone(),
                is_host: entry.is_host,
                last_ack_seq: self.cursor(entry.session),
                grace_end,
            },
        );
        self.broadcast_to_room(&entry.room, ServerMessage::PlayerLeft { player_id: entry.session }, None);
    }

    /// Sessions whose grace record has expired as of `now`, with no
    /// reconnect having cleared it in the meantime.
    pub fn expired_grace_sessions(&self, now: DateTime<Utc>) -> Vec<PlayerId> {
        self.grace.iter().filter(|entry| now >= entry.grace_end).map(|entry| *entry.key()).collect()
    }

    /// The room a still-in-grace session was last seated in, if any.
    pub fn grace_room(&self, session: PlayerId) -> Option<RoomCode> {
        self.grace.get(&session).map(|record| record.room.clone())
    }

    /// Finalizes a session whose grace period elapsed without a reconnect:
    /// drops the grace record and, only now, removes it from `presence`.
    pub fn expire_grace(&self, session: PlayerId) {
        if let Some((_, record)) = self.grace.remove(&session) {
            if let Some(mut members) = self.presence.get_mut(&record.room) {
                members.remove(&session);
            }
        }
    }

    /// Every session currently present in `room`, live or not; used by the
    /// broadcast pump to know who to fan an event out to.
    pub fn members_of(&self, room: &RoomCode) -> Vec<PlayerId> {
        self.presence.get(room).map(|members| members.iter().copied().collect()).unwrap_or_default()
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<RoomCode> {
        self.connections.get(&connection_id).map(|entry| entry.room.clone())
    }

    pub fn session_of(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&connection_id).map(|entry| entry.session)
    }
}

fn close_frame() -> String {
    serde_json::to_string(&ServerMessage::Error { message: "replaced by a new connection".to_string() })
        .expect("ServerMessage::Error always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(session: PlayerId, room: &RoomCode) -> (Registration, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Registration { session, room: room.clone(), display_name: "Ada".to_string(), is_host: true, sender: tx }, rx)
    }

    #[test]
    fn register_then_lookup_room_and_session() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);

        let id = manager.register(registration);
        assert_eq!(manager.room_of(id), Some(room));
        assert_eq!(manager.session_of(id), Some(session));
    }

    #[test]
    fn registering_twice_closes_the_old_connection() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (first, mut first_rx) = registration(session, &room);
        let (second, _second_rx) = registration(session, &room);

        let first_id = manager.register(first);
        let second_id = manager.register(second);

        assert_ne!(first_id, second_id);
        assert!(first_rx.try_recv().is_ok(), "old connection should receive a close message");
        assert_eq!(manager.session_of(first_id), None);
        assert_eq!(manager.session_of(second_id), Some(session));
    }

    #[test]
    fn disconnect_with_grace_preserves_resume_point() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        let id = manager.register(registration);

        manager.acknowledge(session, 5);
        manager.disconnect(id, true);

        assert_eq!(manager.resume_point(session, 3), 5);
        assert_eq!(manager.resume_point(session, 9), 9);
    }

    #[test]
    fn grace_session_still_receives_outbox_entries_for_replay() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        let id = manager.register(registration);
        manager.disconnect(id, true);

        assert!(manager.members_of(&room).contains(&session), "grace session must remain a room member");

        manager.send_to_session(session, ServerMessage::GameCheckpoint { seq_num: 7, view: test_view(session) });
        let replay = manager.replay_after(session, 0);
        assert_eq!(replay.len(), 1, "send_to_session must still append to the outbox while in grace");
    }

    #[test]
    fn expire_grace_removes_the_session_from_presence() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        let id = manager.register(registration);
        manager.disconnect(id, true);

        manager.expire_grace(session);

        assert!(!manager.members_of(&room).contains(&session));
    }

    #[test]
    fn disconnect_without_grace_drops_resume_state() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        let id = manager.register(registration);

        manager.acknowledge(session, 5);
        manager.disconnect(id, false);

        assert_eq!(manager.resume_point(session, 3), 3);
    }

    #[test]
    fn outbox_replay_returns_only_entries_after_cursor() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        manager.register(registration);

        for seq in 1..=3u64 {
            manager.send_to_session(
                session,
                ServerMessage::GameCheckpoint { seq_num: seq, view: test_view(session) },
            );
        }

        let replay = manager.replay_after(session, 1);
        assert_eq!(replay.len(), 2);
    }

    #[test]
    fn outbox_is_capped_to_configured_capacity() {
        let mut config = ServerConfig::default();
        config.outbox_capacity = 2;
        let manager = ConnectionManager::new(config);
        let room = RoomCode::new("AAAAAA");
        let session = PlayerId::new();
        let (registration, _rx) = registration(session, &room);
        manager.register(registration);

        for seq in 1..=5u64 {
            manager.send_to_session(
                session,
                ServerMessage::GameCheckpoint { seq_num: seq, view: test_view(session) },
            );
        }

        let replay = manager.replay_after(session, 0);
        assert_eq!(replay.len(), 2);
    }

    #[test]
    fn acknowledge_never_rewinds() {
        let manager = ConnectionManager::new(ServerConfig::default());
        let session = PlayerId::new();
        manager.acknowledge(session, 5);
        manager.acknowledge(session, 2);
        assert_eq!(manager.cursor(session), 5);
    }

    fn test_view(viewer: PlayerId) -> display::core::game_view::GameView {
        display::core::game_view::GameView {
            game_id: data::core::primitives::GameId::new(),
            phase: data::game_states::phase::GamePhase::Setup,
            viewer,
            current_player: viewer,
            your_turn: true,
            players: Vec::new(),
            deck_count: 0,
            discard_top: None,
            drawn_card: None,
            stack_caller: None,
            end_caller: None,
            winner: None,
        }
    }
}
