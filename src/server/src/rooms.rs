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

//! Room lifecycle: lobby membership, separate from whatever game loop (if
//! any) is currently running for that room. A room can exist with no
//! active game (waiting for players) and outlives any one game within it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use data::actions::message::EngineMessage;
use data::core::primitives::{GameId, PlayerId, RoomCode};
use data::rooms::room::{Room, RoomPhase};
use database::{CheckpointStore, EventStream, GameStore};
use rand::thread_rng;
use tracing::info;

use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::orchestrator::{self, RoomHandle};

/// How often [RoomManager::spawn_grace_sweep] checks for grace records past
/// their expiry. Coarser than the heartbeat interval since a late sweep
/// only delays freeing an abandoned seat, never incorrectly evicts one.
const GRACE_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// What can go wrong joining or starting a room, surfaced to the caller as
/// a close code or error message rather than a hard error: none of these
/// represent a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    NotFound,
    RoomFull,
    AlreadyStarted,
    NotHost,
    NotEnoughPlayers,
}

/// Owns every room's lobby state and, for rooms with a game in progress,
/// the handle to that room's loop.
pub struct RoomManager {
    rooms: DashMap<RoomCode, Room>,
    active: DashMap<RoomCode, RoomHandle>,
    store: Arc<dyn GameStore>,
    stream: Arc<dyn EventStream>,
    checkpoints: Arc<dyn CheckpointStore>,
    connections: Arc<ConnectionManager>,
    config: ServerConfig,
}

impl RoomManager {
    pub fn new(
        store: Arc<dyn GameStore>,
        stream: Arc<dyn EventStream>,
        checkpoints: Arc<dyn CheckpointStore>,
        connections: Arc<ConnectionManager>,
        config: ServerConfig,
    ) -> Self {
        Self { rooms: DashMap::new(), active: DashMap::new(), store, stream, checkpoints, connections, config }
    }

    /// Creates a new room hosted by `host`, returning its freshly generated
    /// code.
    pub fn create_room(&self, host: PlayerId, host_name: impl Into<String>) -> RoomCode {
        let code = RoomCode::generate(&mut thread_rng());
        let room = Room::new(code.clone(), host, host_name, Utc::now());
        self.rooms.insert(code.clone(), room);
        info!(%code, "room created");
        code
    }

    pub fn room_summary(&self, code: &RoomCode) -> Option<Room> {
        self.rooms.get(code).map(|r| r.clone())
    }

    pub fn join_room(&self, code: &RoomCode, player: PlayerId, display_name: impl Into<String>) -> Result<Room, RoomError> {
        let mut entry = self.rooms.get_mut(code).ok_or(RoomError::NotFound)?;
        if entry.phase != RoomPhase::Waiting {
            return Err(RoomError::AlreadyStarted);
        }
        if !entry.add_member(player, display_name, Utc::now()) && !entry.is_member(player) {
            return Err(RoomError::RoomFull);
        }
        Ok(entry.clone())
    }

    pub fn leave_room(&self, code: &RoomCode, player: PlayerId) {
        if let Some(mut entry) = self.rooms.get_mut(code) {
            entry.remove_member(player);
        }
    }

    /// Deals a fresh game for `code` and spawns its room loop, transitioning
    /// the room's lobby phase to `InGame`. Only the host may start a game,
    /// and only while the room has no game already running.
    pub fn start_game(&self, code: &RoomCode, requester: PlayerId) -> Result<(), RoomError> {
        let mut entry = self.rooms.get_mut(code).ok_or(RoomError::NotFound)?;
        if entry.host != requester {
            return Err(RoomError::NotHost);
        }
        if entry.phase != RoomPhase::Waiting {
            return Err(RoomError::AlreadyStarted);
        }
        if (entry.members.len() as u8) < entry.config.min_players {
            return Err(RoomError::NotEnoughPlayers);
        }

        let seats: Vec<(PlayerId, String)> = entry.members.iter().map(|m| (m.id, m.display_name.clone())).collect();
        let seed = if entry.config.deterministic { Some(0) } else { None };
        let game = rules::new_game::create(GameId::new(), seats, entry.config, seed, Utc::now());
        entry.active_game = Some(game.id);
        entry.phase = RoomPhase::InGame;
        drop(entry);

        let handle = orchestrator::spawn_room(
            code.clone(),
            game,
            0,
            self.store.clone(),
            self.stream.clone(),
            self.checkpoints.clone(),
            self.connections.clone(),
            self.config.clone(),
        );
        self.active.insert(code.clone(), handle);
        info!(%code, "game started");
        Ok(())
    }

    /// Forwards a player's action into the running game loop for `code`, if
    /// one exists.
    pub fn dispatch(&self, code: &RoomCode, message: EngineMessage) -> Result<(), RoomError> {
        let handle = self.active.get(code).ok_or(RoomError::NotFound)?;
        let _ = handle.inbound.send(message);
        Ok(())
    }

    pub fn is_in_game(&self, code: &RoomCode) -> bool {
        self.active.contains_key(code)
    }

    /// Tears down a finished or abandoned room's loop, if any, and drops its
    /// lobby entry.
    pub fn close_room(&self, code: &RoomCode) {
        if let Some((_, mut handle)) = self.active.remove(code) {
            handle.shutdown();
        }
        self.rooms.remove(code);
    }

    /// Periodically sweeps expired grace records, dropping each session's
    /// room seat for good once its grace period has elapsed without a
    /// reconnect. Spawned once at startup; runs for the lifetime of the
    /// process.
    pub fn spawn_grace_sweep(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(GRACE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                for session in self.connections.expired_grace_sessions(Utc::now()) {
                    if let Some(room) = self.connections.grace_room(session) {
                        self.leave_room(&room, session);
                    }
                    self.connections.expire_grace(session);
                }
            }
        });
    }

    /// Rehydrates every room the durable store still considers active,
    /// reconstructing lobby membership from the snapshotted players and
    /// resuming the broadcast pump from the latest checkpoint's stream
    /// position. Called once at process startup; this is what lets an
    /// in-progress game survive a restart.
    pub async fn recover(&self) -> color_eyre::Result<usize> {
        let mut recovered = 0;
        for code in self.store.list_active().await? {
            let Some(game) = self.store.load(&code).await? else { continue };
            let stream_position =
                self.checkpoints.latest(&code).await?.map(|checkpoint| checkpoint.stream_position).unwrap_or(0);

            let members = game
                .players
                .iter()
                .map(|p| data::rooms::room::RoomMember { id: p.id, display_name: p.display_name.clone(), joined_at: Utc::now() })
                .collect::<Vec<_>>();
            let host = members.first().map(|m| m.id).unwrap_or_else(PlayerId::new);
            let room = Room {
                code: code.clone(),
                host,
                phase: RoomPhase::InGame,
                members,
                config: game.configuration,
                active_game: Some(game.id),
                last_activity: Utc::now(),
            };
            self.rooms.insert(code.clone(), room);

            let handle = orchestrator::spawn_room(
                code.clone(),
                game,
                stream_position,
                self.store.clone(),
                self.stream.clone(),
                self.checkpoints.clone(),
                self.connections.clone(),
                self.config.clone(),
            );
            self.active.insert(code, handle);
            recovered += 1;
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use database::SledStore;

    use super::*;
    use crate::connection::ConnectionManager;

    fn manager() -> RoomManager {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path()).unwrap());
        RoomManager::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(ConnectionManager::new(ServerConfig::default())),
            ServerConfig::default(),
        )
    }

    #[test]
    fn create_then_join_adds_a_member() {
        let rooms = manager();
        let host = PlayerId::new();
        let code = rooms.create_room(host, "Ada");
        let guest = PlayerId::new();
        let room = rooms.join_room(&code, guest, "Grace").unwrap();
        assert_eq!(room.members.len(), 2);
    }

    #[test]
    fn non_host_cannot_start_game() {
        let rooms = manager();
        let host = PlayerId::new();
        let code = rooms.create_room(host, "Ada");
        let guest = PlayerId::new();
        rooms.join_room(&code, guest, "Grace").unwrap();
        assert_eq!(rooms.start_game(&code, guest), Err(RoomError::NotHost));
    }

    #[test]
    fn starting_with_too_few_players_is_rejected() {
        let rooms = manager();
        let host = PlayerId::new();
        let code = rooms.create_room(host, "Ada");
        assert_eq!(rooms.start_game(&code, host), Err(RoomError::NotEnoughPlayers));
    }

    #[test]
    fn joining_an_unknown_room_is_not_found() {
        let rooms = manager();
        let code = RoomCode::new("GHOST");
        assert_eq!(rooms.join_room(&code, PlayerId::new(), "Nobody"), Err(RoomError::NotFound));
    }
}
