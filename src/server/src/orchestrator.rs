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

//! The room loop: the single writer that owns one room's [GameState] for
//! the room's entire lifetime. Spawned once per active room by
//! [spawn_room]; shut down when the inbound channel closes or the game
//! reaches [GamePhase::Ended].

use std::sync::Arc;

use chrono::Utc;
use data::actions::message::{EngineMessage, SystemIntent};
use data::core::primitives::RoomCode;
use data::game_states::game_state::GameState;
use data::game_states::phase::GamePhase;
use database::{Checkpoint, CheckpointStore, EventStream, GameStore};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info_span, warn, Instrument};
use utils::outcome::StopCondition;

use crate::broadcast;
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;

/// A handle to a spawned room: the channel used to feed it player intents,
/// plus a way to ask both its tasks (loop and broadcast pump) to stop.
pub struct RoomHandle {
    pub inbound: mpsc::UnboundedSender<EngineMessage>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RoomHandle {
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawns the room loop and its broadcast pump for `room`, starting from
/// `game` (either a freshly created game or one loaded from a checkpoint).
/// `stream_position` is the stream id the broadcast pump should resume
/// tailing from.
pub fn spawn_room(
    room: RoomCode,
    game: GameState,
    stream_position: u64,
    store: Arc<dyn GameStore>,
    stream: Arc<dyn EventStream>,
    checkpoints: Arc<dyn CheckpointStore>,
    connections: Arc<ConnectionManager>,
    config: ServerConfig,
) -> RoomHandle {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let notify = Arc::new(Notify::new());

    let loop_connections = connections.clone();
    tokio::spawn(
        broadcast::run_broadcast_pump(room.clone(), stream.clone(), connections, notify.clone(), stream_position, shutdown_rx)
            .instrument(info_span!("broadcast_pump", room = %room)),
    );

    let loop_room = room.clone();
    tokio::spawn(
        run_room_loop(loop_room, game, inbound_rx, store, stream, checkpoints, loop_connections, notify, config)
            .instrument(info_span!("room_loop", room = %room)),
    );

    RoomHandle { inbound: inbound_tx, shutdown: Some(shutdown_tx) }
}

/// Timeout messages synthesized from the game's own armed timers: the room
/// loop is responsible for noticing wall-clock expiry, since the Engine
/// itself is a pure step function with no notion of "now" outside of what
/// is passed to it.
fn due_timers(game: &GameState, now: chrono::DateTime<Utc>) -> Vec<EngineMessage> {
    let mut due = Vec::new();
    if let Some(timer) = game.timers.setup {
        if now >= timer.expires_at {
            due.push(EngineMessage::system(SystemIntent::SetupTimeout { timer: timer.id }));
        }
    }
    if let Some(timer) = game.timers.turn_transition {
        if now >= timer.expires_at {
            due.push(EngineMessage::system(SystemIntent::TurnTransitionTimeout { timer: timer.id }));
        }
    }
    if let Some(timer) = game.timers.special_action {
        if now >= timer.expires_at {
            due.push(EngineMessage::system(SystemIntent::SpecialActionTimeout { timer: timer.id }));
        }
    }
    if let Some(timer) = game.timers.stack {
        if now >= timer.expires_at {
            due.push(EngineMessage::system(SystemIntent::StackTimeout { timer: timer.id }));
        }
    }
    due
}

async fn run_room_loop(
    room: RoomCode,
    mut game: GameState,
    mut inbound: mpsc::UnboundedReceiver<EngineMessage>,
    store: Arc<dyn GameStore>,
    stream: Arc<dyn EventStream>,
    checkpoints: Arc<dyn CheckpointStore>,
    connections: Arc<ConnectionManager>,
    notify: Arc<Notify>,
    config: ServerConfig,
) {
    let mut stream_position = 0u64;

    loop {
        let mut messages: Vec<EngineMessage> = std::iter::from_fn(|| inbound.try_recv().ok()).collect();

        if messages.is_empty() && due_timers(&game, Utc::now()).is_empty() {
            tokio::select! {
                received = inbound.recv() => {
                    match received {
                        Some(message) => messages.push(message),
                        None => {
                            debug!("inbound channel closed, shutting down room loop");
                            return;
                        }
                    }
                }
                _ = tokio::time::sleep(config.room_loop_idle_sleep()) => {}
            }
        }

        messages.extend(due_timers(&game, Utc::now()));
        if messages.is_empty() {
            continue;
        }

        let mut produced_any = false;
        let mut checkpoint_requested = false;
        for message in messages {
            let now = Utc::now();
            match rules::engine::process(&mut game, message, now) {
                Ok(result) => {
                    if result.events.is_empty() {
                        continue;
                    }
                    produced_any = true;
                    checkpoint_requested |= result.checkpoint_requested;
                    for event in &result.events {
                        stream_position = append_with_retry(&*stream, &room, event, &config).await;
                    }
                    notify.notify_one();
                }
                Err(StopCondition::Rejected(reason)) => {
                    debug!(%reason, "rejected player intent");
                }
                Err(StopCondition::Error(error)) => {
                    warn!(?error, "engine processing error");
                }
            }
        }

        if produced_any {
            snapshot_with_retry(&*store, &room, &game, &config).await;
            if checkpoint_requested {
                let sequence_num = connections.current_seq(&room);
                let checkpoint = Checkpoint::capture(&game, stream_position, sequence_num, Utc::now());
                write_checkpoint(&*checkpoints, &room, &checkpoint).await;
            }
        }

        if game.phase == GamePhase::Ended {
            debug!("game ended, room loop exiting");
            return;
        }
    }
}

async fn append_with_retry(
    stream: &dyn EventStream,
    room: &RoomCode,
    event: &data::events::event::GameEvent,
    config: &ServerConfig,
) -> u64 {
    let mut backoff = config.store_retry_backoff();
    loop {
        match stream.append(room, event).await {
            Ok(id) => return id,
            Err(error) => {
                warn!(?error, "event append failed, retrying");
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }
    }
}

async fn snapshot_with_retry(store: &dyn GameStore, room: &RoomCode, game: &GameState, config: &ServerConfig) {
    let mut backoff = config.store_retry_backoff();
    loop {
        match store.snapshot(room, game).await {
            Ok(()) => return,
            Err(error) => {
                warn!(?error, "snapshot write failed, retrying");
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }
    }
}

async fn write_checkpoint(checkpoints: &dyn CheckpointStore, room: &RoomCode, checkpoint: &Checkpoint) {
    if let Err(error) = checkpoints.write(room, checkpoint).await {
        warn!(?error, "checkpoint write failed");
    }
}

#[cfg(test)]
mod tests {
    use data::game_states::timers::ArmedTimer;
    use data::game_states::timers::Timers;

    use super::*;

    fn empty_game() -> GameState {
        rules::new_game::create(
            data::core::primitives::GameId::new(),
            vec![(data::core::primitives::PlayerId::new(), "Ada".to_string())],
            data::game_states::game_state::GameConfiguration::default(),
            Some(1),
            Utc::now(),
        )
    }

    #[test]
    fn due_timers_is_empty_when_nothing_armed() {
        let mut game = empty_game();
        game.timers = Timers::default();
        assert!(due_timers(&game, Utc::now()).is_empty());
    }

    #[test]
    fn setup_timeout_becomes_due_after_expiry() {
        let mut game = empty_game();
        let now = Utc::now();
        game.timers.setup = Some(ArmedTimer::arm(now - chrono::Duration::seconds(1), chrono::Duration::seconds(0)));
        let due = due_timers(&game, now);
        assert_eq!(due.len(), 1);
        assert!(matches!(due[0], EngineMessage::System(SystemIntent::SetupTimeout { .. })));
    }

    #[test]
    fn armed_but_not_yet_expired_timer_is_not_due() {
        let mut game = empty_game();
        let now = Utc::now();
        game.timers.setup = Some(ArmedTimer::arm(now, chrono::Duration::seconds(10)));
        assert!(due_timers(&game, now).is_empty());
    }
}
