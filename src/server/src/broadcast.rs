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

//! The broadcast pump: wakes whenever the room loop appends new events,
//! tails the event stream from where it last left off, and fans each event
//! out to every room member with its own redacted view. Runs alongside the
//! room loop rather than inside it so a slow or disconnected recipient can
//! never hold up game processing.

use std::sync::Arc;

use data::core::primitives::RoomCode;
use database::EventStream;
use display::core::event_view::redact;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::connection::ConnectionManager;

/// Runs until `shutdown` fires or its sender is dropped. `from` is the
/// stream position to start tailing after (exclusive).
pub async fn run_broadcast_pump(
    room: RoomCode,
    stream: Arc<dyn EventStream>,
    connections: Arc<ConnectionManager>,
    notify: Arc<Notify>,
    from: u64,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut cursor = from;

    loop {
        tokio::select! {
            _ = notify.notified() => {}
            _ = &mut shutdown => {
                debug!("broadcast pump shutting down");
                return;
            }
        }

        let entries = match stream.read_after(&room, cursor).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(?error, "failed to read event stream, retrying on next wake");
                continue;
            }
        };

        for (stream_id, event) in entries {
            cursor = stream_id;
            let seq = connections.next_seq(&room);
            for member in connections.members_of(&room) {
                let redacted = redact(&event.kind, member);
                let msg = display::protocol::envelope::ServerMessage::GameEvent {
                    seq_num: seq,
                    stream_id,
                    event: redacted,
                    timestamp: event.timestamp,
                };
                connections.send_to_session(member, msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use color_eyre::Result;
    use data::core::primitives::PlayerId;
    use data::events::event::{EventKind, GameEvent};
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::ServerConfig;
    use crate::connection::Registration;

    struct FakeStream {
        events: tokio::sync::Mutex<Vec<(u64, GameEvent)>>,
        next_id: AtomicU64,
    }

    impl FakeStream {
        fn new() -> Self {
            Self { events: tokio::sync::Mutex::new(Vec::new()), next_id: AtomicU64::new(1) }
        }
    }

    #[async_trait]
    impl EventStream for FakeStream {
        async fn append(&self, _room: &RoomCode, event: &GameEvent) -> Result<u64> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.events.lock().await.push((id, event.clone()));
            Ok(id)
        }

        async fn read_after(&self, _room: &RoomCode, after: u64) -> Result<Vec<(u64, GameEvent)>> {
            Ok(self.events.lock().await.iter().filter(|(id, _)| *id > after).cloned().collect())
        }

        async fn latest_id(&self, _room: &RoomCode) -> Result<u64> {
            Ok(self.events.lock().await.last().map(|(id, _)| *id).unwrap_or(0))
        }
    }

    #[tokio::test]
    async fn delivers_a_newly_appended_event_to_a_room_member() {
        let room = RoomCode::new("TEST");
        let stream: Arc<dyn EventStream> = Arc::new(FakeStream::new());
        let connections = Arc::new(ConnectionManager::new(ServerConfig::default()));
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let player = PlayerId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        connections.register(Registration {
            session: player,
            room: room.clone(),
            display_name: "Ada".to_string(),
            is_host: true,
            sender: tx,
        });

        let pump = tokio::spawn(run_broadcast_pump(
            room.clone(),
            stream.clone(),
            connections.clone(),
            notify.clone(),
            0,
            shutdown_rx,
        ));

        stream.append(&room, &GameEvent::new(EventKind::CardDrawn { player }, chrono::Utc::now())).await.unwrap();
        notify.notify_one();

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv()).await;
        assert!(received.is_ok());
        assert!(received.unwrap().is_some());

        let _ = shutdown_tx.send(());
        let _ = pump.await;
    }
}
