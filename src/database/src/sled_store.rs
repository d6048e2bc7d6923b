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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::Context;
use color_eyre::Result;
use data::core::primitives::RoomCode;
use data::events::event::GameEvent;
use data::game_states::game_state::GameState;
use data::game_states::phase::GamePhase;
use serde::{Deserialize, Serialize};
use sled::{Db, IVec, Tree};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::event_stream::{EventStream, STREAM_CAP};
use crate::game_store::GameStore;
use crate::heal;

/// Soft expiration for a room's game snapshot: abandoned games self-purge
/// rather than accumulating forever.
const GAME_TTL: chrono::Duration = chrono::Duration::hours(24);

#[derive(Debug, Serialize, Deserialize)]
struct StoredGame {
    state: GameState,
    written_at: DateTime<Utc>,
}

/// A single `sled` database backing the durable game store, event stream,
/// and checkpoint store. Each concern lives in its own tree so that a scan
/// over one never touches the others.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = sled::open(path).with_context(|| "failed to open sled database")?;
        Ok(Self { db })
    }

    fn games(&self) -> Result<Tree> {
        self.db.open_tree("games").with_context(|| "failed to open 'games' tree")
    }

    fn stream(&self) -> Result<Tree> {
        self.db.open_tree("stream").with_context(|| "failed to open 'stream' tree")
    }

    fn checkpoints(&self) -> Result<Tree> {
        self.db.open_tree("checkpoints").with_context(|| "failed to open 'checkpoints' tree")
    }
}

fn room_key(room: &RoomCode) -> Vec<u8> {
    room.0.as_bytes().to_vec()
}

/// Stream keys are `{room_code}\0{id as big-endian u64}` so that a
/// `scan_prefix` over the room code yields entries in id order.
fn stream_key(room: &RoomCode, id: u64) -> Vec<u8> {
    let mut key = room.0.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn stream_prefix(room: &RoomCode) -> Vec<u8> {
    let mut key = room.0.as_bytes().to_vec();
    key.push(0);
    key
}

fn id_from_stream_key(key: &IVec, prefix_len: usize) -> Result<u64> {
    let bytes = &key[prefix_len..];
    let arr: [u8; 8] =
        bytes.try_into().map_err(|_| color_eyre::eyre::eyre!("malformed stream key"))?;
    Ok(u64::from_be_bytes(arr))
}

#[async_trait]
impl GameStore for SledStore {
    async fn snapshot(&self, room: &RoomCode, state: &GameState) -> Result<()> {
        let stored = StoredGame { state: state.clone(), written_at: Utc::now() };
        let bytes =
            serde_json::to_vec(&stored).with_context(|| "failed to serialize game snapshot")?;
        self.games()?.insert(room_key(room), bytes).with_context(|| "failed to write snapshot")?;
        self.db.flush().with_context(|| "failed to flush sled database")?;
        Ok(())
    }

    async fn load(&self, room: &RoomCode) -> Result<Option<GameState>> {
        let Some(bytes) = self.games()?.get(room_key(room)).with_context(|| "failed to read snapshot")?
        else {
            return Ok(None);
        };
        let stored: StoredGame =
            serde_json::from_slice(&bytes).with_context(|| "failed to deserialize game snapshot")?;
        if Utc::now() - stored.written_at > GAME_TTL {
            return Ok(None);
        }
        let mut state = stored.state;
        heal::heal(&mut state);
        Ok(Some(state))
    }

    async fn list_active(&self) -> Result<Vec<RoomCode>> {
        let mut rooms = Vec::new();
        for entry in self.games()?.iter() {
            let (key, value) = entry.with_context(|| "failed to scan 'games' tree")?;
            let stored: StoredGame = serde_json::from_slice(&value)
                .with_context(|| "failed to deserialize game snapshot during scan")?;
            if Utc::now() - stored.written_at > GAME_TTL || stored.state.phase == GamePhase::Ended {
                continue;
            }
            let code = String::from_utf8(key.to_vec())
                .with_context(|| "non-UTF8 room code key in 'games' tree")?;
            rooms.push(RoomCode::new(code));
        }
        Ok(rooms)
    }

    async fn delete(&self, room: &RoomCode) -> Result<()> {
        self.games()?.remove(room_key(room)).with_context(|| "failed to delete snapshot")?;
        let prefix = stream_prefix(room);
        for entry in self.stream()?.scan_prefix(&prefix) {
            let (key, _) = entry.with_context(|| "failed to scan stream for deletion")?;
            self.stream()?.remove(key)?;
        }
        self.checkpoints()?.remove(room_key(room))?;
        Ok(())
    }
}

#[async_trait]
impl EventStream for SledStore {
    async fn append(&self, room: &RoomCode, event: &GameEvent) -> Result<u64> {
        let id = self.db.generate_id().with_context(|| "failed to generate stream id")?;
        let bytes = serde_json::to_vec(event).with_context(|| "failed to serialize event")?;
        let tree = self.stream()?;
        tree.insert(stream_key(room, id), bytes).with_context(|| "failed to append event")?;

        let prefix = stream_prefix(room);
        let keys: Vec<IVec> =
            tree.scan_prefix(&prefix).keys().collect::<sled::Result<Vec<_>>>()?;
        if keys.len() > STREAM_CAP {
            for key in keys.iter().take(keys.len() - STREAM_CAP) {
                tree.remove(key)?;
            }
        }
        Ok(id)
    }

    async fn read_after(&self, room: &RoomCode, after: u64) -> Result<Vec<(u64, GameEvent)>> {
        let prefix = stream_prefix(room);
        let mut out = Vec::new();
        for entry in self.stream()?.scan_prefix(&prefix) {
            let (key, value) = entry.with_context(|| "failed to scan event stream")?;
            let id = id_from_stream_key(&key, prefix.len())?;
            if id <= after {
                continue;
            }
            let event: GameEvent =
                serde_json::from_slice(&value).with_context(|| "failed to deserialize event")?;
            out.push((id, event));
        }
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }

    async fn latest_id(&self, room: &RoomCode) -> Result<u64> {
        let prefix = stream_prefix(room);
        let last = self.stream()?.scan_prefix(&prefix).keys().last();
        match last {
            Some(key) => id_from_stream_key(&key?, prefix.len()),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl CheckpointStore for SledStore {
    async fn write(&self, room: &RoomCode, checkpoint: &Checkpoint) -> Result<()> {
        let bytes =
            serde_json::to_vec(checkpoint).with_context(|| "failed to serialize checkpoint")?;
        self.checkpoints()?
            .insert(room_key(room), bytes)
            .with_context(|| "failed to write checkpoint")?;
        Ok(())
    }

    async fn latest(&self, room: &RoomCode) -> Result<Option<Checkpoint>> {
        let Some(bytes) =
            self.checkpoints()?.get(room_key(room)).with_context(|| "failed to read checkpoint")?
        else {
            return Ok(None);
        };
        let checkpoint = serde_json::from_slice(&bytes)
            .with_context(|| "failed to deserialize checkpoint")?;
        Ok(Some(checkpoint))
    }
}

#[cfg(test)]
mod tests {
    use data::cards::deck::Deck;
    use data::core::primitives::GameId;
    use data::events::event::EventKind;
    use data::game_states::game_state::{GameConfiguration, GameHistory};
    use data::game_states::player_state::PlayerState;
    use data::game_states::timers::Timers;
    use data::game_states::visibility::VisibilityMap;
    use data::core::primitives::PlayerId;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::*;

    fn open_temp() -> (tempfile::TempDir, SledStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn sample_state(phase: GamePhase) -> GameState {
        GameState {
            id: GameId::new(),
            phase,
            configuration: GameConfiguration::default(),
            players: vec![PlayerState::new(PlayerId::new(), "Ada")],
            current_player_index: 0,
            deck: Deck::default(),
            discard_pile: Vec::new(),
            drawn_card: None,
            stack_caller: None,
            special_action: None,
            king_view: None,
            end_caller: None,
            final_round_started: false,
            winner: None,
            timers: Timers::default(),
            visibility: VisibilityMap::default(),
            history: GameHistory::new(32),
            rng: Xoshiro256StarStar::seed_from_u64(1),
        }
    }

    #[tokio::test]
    async fn snapshot_then_load_round_trips() {
        let (_dir, store) = open_temp();
        let room = RoomCode::new("AAAAAA");
        let state = sample_state(GamePhase::Playing);

        store.snapshot(&room, &state).await.unwrap();
        let loaded = store.load(&room).await.unwrap().unwrap();
        assert_eq!(loaded.id, state.id);
        assert_eq!(loaded.phase, state.phase);
    }

    #[tokio::test]
    async fn load_of_missing_room_is_none() {
        let (_dir, store) = open_temp();
        assert!(store.load(&RoomCode::new("ZZZZZZ")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_active_excludes_ended_games() {
        let (_dir, store) = open_temp();
        let active = RoomCode::new("AAAAAA");
        let ended = RoomCode::new("BBBBBB");
        store.snapshot(&active, &sample_state(GamePhase::Playing)).await.unwrap();
        store.snapshot(&ended, &sample_state(GamePhase::Ended)).await.unwrap();

        let rooms = store.list_active().await.unwrap();
        assert_eq!(rooms, vec![active]);
    }

    #[tokio::test]
    async fn stream_append_assigns_monotonic_ids() {
        let (_dir, store) = open_temp();
        let room = RoomCode::new("AAAAAA");
        let event = GameEvent::new(
            EventKind::GameStarted { starting_player: PlayerId::new() },
            Utc::now(),
        );

        let first = store.append(&room, &event).await.unwrap();
        let second = store.append(&room, &event).await.unwrap();
        assert!(second > first);

        let entries = store.read_after(&room, first).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, second);
    }

    #[tokio::test]
    async fn read_after_is_empty_for_latest_id() {
        let (_dir, store) = open_temp();
        let room = RoomCode::new("AAAAAA");
        let event = GameEvent::new(
            EventKind::GameStarted { starting_player: PlayerId::new() },
            Utc::now(),
        );
        store.append(&room, &event).await.unwrap();
        let latest = store.latest_id(&room).await.unwrap();
        assert!(store.read_after(&room, latest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkpoint_round_trips() {
        let (_dir, store) = open_temp();
        let room = RoomCode::new("AAAAAA");
        let state = sample_state(GamePhase::Playing);
        let checkpoint = Checkpoint::capture(&state, 7, 1, Utc::now());

        store.write(&room, &checkpoint).await.unwrap();
        let loaded = store.latest(&room).await.unwrap().unwrap();
        assert_eq!(loaded.stream_position, 7);
        assert_eq!(loaded.state.id, state.id);
    }

    #[tokio::test]
    async fn delete_removes_snapshot_and_stream() {
        let (_dir, store) = open_temp();
        let room = RoomCode::new("AAAAAA");
        let state = sample_state(GamePhase::Playing);
        store.snapshot(&room, &state).await.unwrap();
        let event = GameEvent::new(
            EventKind::GameStarted { starting_player: PlayerId::new() },
            Utc::now(),
        );
        store.append(&room, &event).await.unwrap();

        store.delete(&room).await.unwrap();
        assert!(store.load(&room).await.unwrap().is_none());
        assert_eq!(store.latest_id(&room).await.unwrap(), 0);
    }
}
