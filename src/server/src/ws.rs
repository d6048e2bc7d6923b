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

//! The WebSocket edge: upgrades the HTTP connection, authenticates the
//! session against the room, and splits into a read task (client frames →
//! connection manager / room dispatch) and a write task (outbound channel
//! → client frames), plus a heartbeat task that pings on an interval and
//! moves the connection to grace on a missed pong.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use data::actions::message::EngineMessage;
use data::core::primitives::{PlayerId, RoomCode};
use database::{CheckpointStore, EventStream};
use display::protocol::client_message::ClientMessage;
use display::protocol::envelope::{
    ServerMessage, CLOSE_GAME_NOT_ACTIVE, CLOSE_NOT_IN_ROOM, CLOSE_UNAUTHORIZED,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::connection::{ConnectionManager, Registration};
use crate::name_service::NameService;
use crate::rooms::RoomManager;

/// Everything needed to serve WebSocket upgrades: the shared room registry
/// and connection manager, the durable checkpoint/event stream used to
/// resync a reconnecting client, plus the (external) name service used only
/// to resolve a session's display name.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomManager>,
    pub connections: Arc<ConnectionManager>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub stream: Arc<dyn EventStream>,
    pub names: Arc<dyn NameService>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    room: String,
    player: PlayerId,
    #[serde(default)]
    last_seq: u64,
}

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let room_code = RoomCode::new(params.room);
    let player = params.player;

    let Some(room) = state.rooms.room_summary(&room_code) else {
        close_with(socket, CLOSE_NOT_IN_ROOM, "room does not exist").await;
        return;
    };
    if !room.is_member(player) {
        close_with(socket, CLOSE_UNAUTHORIZED, "not a member of this room").await;
        return;
    }
    let display_name = room.member(player).map(|m| m.display_name.clone()).unwrap_or_else(|| "Player".to_string());
    let is_host = room.host == player;

    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let (close_tx, mut close_rx) = watch::channel(None::<u16>);

    let connection_id = state.connections.register(Registration {
        session: player,
        room: room_code.clone(),
        display_name: display_name.clone(),
        is_host,
        sender: outbound_tx,
    });

    synchronize(&state, &room_code, player, params.last_seq).await;
    state.connections.broadcast_to_room(
        &room_code,
        ServerMessage::PlayerJoined { player_id: player, display_name: display_name.clone() },
        Some(player),
    );

    let write_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                text = outbound_rx.recv() => {
                    let Some(text) = text else { break };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = close_rx.changed() => {
                    let code = *close_rx.borrow();
                    if let Some(code) = code {
                        let _ = sink.send(Message::Close(Some(CloseFrame { code, reason: "".into() }))).await;
                    }
                    break;
                }
            }
        }
    });

    let heartbeat_task = tokio::spawn(run_heartbeat(state.connections.clone(), connection_id, player));

    while let Some(frame) = stream.next().await {
        let Ok(frame) = frame else {
            break;
        };
        match frame {
            Message::Text(text) => {
                if let Some(code) = handle_client_message(&state, &room_code, player, &text).await {
                    let _ = close_tx.send(Some(code));
                    break;
                }
            }
            Message::Pong(_) => state.connections.record_pong(connection_id),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Binary(_) => {}
        }
    }

    heartbeat_task.abort();
    write_task.abort();
    // `disconnect` itself broadcasts `player_left` to the rest of the room
    // when entering grace, so there is nothing left to do here.
    state.connections.disconnect(connection_id, true);
}

/// Pings the connection on an interval and moves it to grace once its last
/// pong is older than the configured timeout. The task is simply aborted
/// when the socket's read loop exits, so it needs no shutdown signal of its
/// own.
async fn run_heartbeat(connections: Arc<ConnectionManager>, connection_id: crate::connection::ConnectionId, player: PlayerId) {
    let mut interval = tokio::time::interval(connections.heartbeat_ping_interval());
    loop {
        interval.tick().await;
        connections.record_ping(connection_id);
        connections.send_to_session(player, ServerMessage::Ping);
        if connections.stale_connections().contains(&connection_id) {
            connections.disconnect(connection_id, true);
            return;
        }
    }
}

/// Handles one inbound frame. Returns `Some(close_code)` when the
/// connection must be closed rather than merely told about the problem.
async fn handle_client_message(state: &AppState, room: &RoomCode, player: PlayerId, text: &str) -> Option<u16> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => {
            state.connections.send_to_session(player, ServerMessage::Error { message: "Invalid JSON".to_string() });
            return None;
        }
    };

    match message {
        ClientMessage::AckSeq { seq_num } => state.connections.acknowledge(player, seq_num),
        ClientMessage::Ping => state.connections.send_to_session(player, ServerMessage::Pong),
        ClientMessage::Pong => state.connections.record_pong_for_session(player),
        ClientMessage::GetSessionInfo => {
            let nickname = state.names.nickname(player).await.ok().flatten().unwrap_or_else(|| {
                state
                    .rooms
                    .room_summary(room)
                    .and_then(|r| r.member(player).map(|m| m.display_name.clone()))
                    .unwrap_or_default()
            });
            state.connections.send_to_session(
                player,
                ServerMessage::SessionInfo {
                    user_id: data::core::primitives::UserId(player.0),
                    nickname,
                    room: Some(room.clone()),
                    is_host: state.connections.is_host(player),
                },
            );
        }
        // Nickname changes are owned by the external name service's own HTTP
        // surface; a client sending this over the game socket has nothing
        // further for the core to do with it.
        ClientMessage::UpdateNickname { .. } => {}
        other => {
            let Some(intent) = other.into_player_intent() else { return None };
            if !state.rooms.is_in_game(room) {
                return Some(CLOSE_GAME_NOT_ACTIVE);
            }
            let _ = state.names.touch_room_activity(room).await;
            if state.rooms.dispatch(room, EngineMessage::player(player, intent)).is_err() {
                warn!(%room, "dispatch to a room with no active loop");
            }
        }
    }
    None
}

/// Sends the reconnect/initial sync: the latest room checkpoint (if any),
/// then replay of anything the session missed since, then a `ready`
/// terminator carrying the resume cursor. Outbox replay is used when it
/// still covers the gap; if the session's entries were evicted by the
/// outbox's capacity cap, the missing span is reconstructed from the event
/// stream instead.
async fn synchronize(state: &AppState, room: &RoomCode, player: PlayerId, client_reported_last_seq: u64) {
    let resume_point = state.connections.resume_point(player, client_reported_last_seq);

    let checkpoint = match state.checkpoints.latest(room).await {
        Ok(checkpoint) => checkpoint,
        Err(error) => {
            warn!(?error, %room, "failed to load latest checkpoint for sync");
            None
        }
    };
    if let Some(checkpoint) = &checkpoint {
        let view = display::rendering::sync::build(&checkpoint.state, player);
        state.connections.send_to_session(
            player,
            ServerMessage::GameCheckpoint { seq_num: checkpoint.sequence_num, view },
        );
    }

    let outbox_floor = state.connections.outbox_floor(player);
    let outbox_covers_gap = outbox_floor.map_or(false, |floor| floor <= resume_point + 1);
    if outbox_covers_gap {
        for message in state.connections.replay_after(player, resume_point) {
            state.connections.send_to_session(player, message);
        }
    } else if let Some(checkpoint) = &checkpoint {
        replay_from_stream(state, room, player, checkpoint, resume_point).await;
    }

    let current_seq = checkpoint.map(|c| c.sequence_num).unwrap_or(0).max(state.connections.cursor(player)).max(resume_point);
    state.connections.acknowledge(player, current_seq);
    state.connections.send_to_session(player, ServerMessage::Ready { current_seq });
}

/// Reconstructs the events folded in after `checkpoint` was captured,
/// redacted for `player`, when the session's outbox no longer covers the
/// gap back to `resume_point`. Sequence numbers are derived from the
/// checkpoint's own `sequence_num` plus position in the stream, mirroring
/// how the broadcast pump assigns them to events in the same order.
async fn replay_from_stream(
    state: &AppState,
    room: &RoomCode,
    player: PlayerId,
    checkpoint: &database::Checkpoint,
    resume_point: u64,
) {
    let entries = match state.stream.read_after(room, checkpoint.stream_position).await {
        Ok(entries) => entries,
        Err(error) => {
            warn!(?error, %room, "failed to read event stream for stream-fallback sync");
            return;
        }
    };
    for (index, (stream_id, event)) in entries.into_iter().enumerate() {
        let seq_num = checkpoint.sequence_num + index as u64 + 1;
        if seq_num <= resume_point {
            continue;
        }
        let redacted = display::core::event_view::redact(&event.kind, player);
        state.connections.send_to_session(
            player,
            ServerMessage::GameEvent { seq_num, stream_id, event: redacted, timestamp: event.timestamp },
        );
    }
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame { code, reason: reason.to_string().into() })))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_params_deserialize_from_query_string() {
        let player = PlayerId::new();
        let query = format!("room=ABCD&player={}&last_seq=3", player);
        let params: ConnectParams = serde_urlencoded::from_str(&query).unwrap();
        assert_eq!(params.room, "ABCD");
        assert_eq!(params.player, player);
        assert_eq!(params.last_seq, 3);
    }
}
