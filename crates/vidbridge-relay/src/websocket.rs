//! WebSocket transport: one task per connection, dispatching JSON
//! `ClientEvent` frames and routing `ServerEvent` frames back out.
//!
//! `currentRoomId`/`currentBroadcastId` are local to this task (see
//! [`crate::connection::Connection`]'s doc comment) -- they're threaded
//! through the dispatch helpers as `&mut Option<String>` rather than
//! stored anywhere shared.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use vidbridge_protocol::ids::connection_id as new_connection_id;
use vidbridge_protocol::{ClientEvent, ParticipantInfo, ServerEvent};

use crate::auth::resolve_handshake_identity;
use crate::chat_relay::{handle_chat_message, handle_chat_reaction};
use crate::connection::{Connection, OUTBOUND_CHANNEL_CAPACITY};
use crate::persistence_queue::PersistenceIntent;
use crate::signaling::{relay as relay_signal, SignalKind};
use crate::state::AppState;

const MAX_ROOM_ID_LEN: usize = 128;
const MAX_BROADCAST_ID_LEN: usize = 64;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(socket: WebSocket, state: AppState, token: Option<String>) {
    let identity = resolve_handshake_identity(token.as_deref(), &state.tokens, &state.credentials).await;
    let connection_id = new_connection_id();
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
    let connection = Arc::new(Connection::new(
        connection_id.clone(),
        identity.user_id.clone(),
        identity.username.clone(),
        outbound_tx,
    ));
    state.connections.register(Arc::clone(&connection));
    tracing::info!(
        connection_id = %connection_id,
        authenticated = identity.authenticated,
        "connection established"
    );

    let (mut sink, mut stream) = socket.split();
    let mut current_room_id: Option<String> = None;
    let mut current_broadcast_id: Option<String> = None;

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(event) = outbound else { break };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if sink.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to encode outbound event"),
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        dispatch(
                            text.as_str(),
                            &state,
                            &connection,
                            &mut current_room_id,
                            &mut current_broadcast_id,
                        )
                        .await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    cleanup(&state, &connection, current_room_id, current_broadcast_id).await;
}

async fn dispatch(
    frame: &str,
    state: &AppState,
    connection: &Connection,
    current_room_id: &mut Option<String>,
    current_broadcast_id: &mut Option<String>,
) {
    let event: ClientEvent = match serde_json::from_str(frame) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, "dropping unparseable client frame");
            return;
        }
    };

    match event {
        ClientEvent::JoinRoom { room_id } => join_room(state, connection, current_room_id, room_id).await,
        ClientEvent::LeaveRoom => leave_current_room(state, connection, current_room_id).await,
        ClientEvent::Offer { to, offer } => {
            relay_signal(SignalKind::Offer, &connection.connection_id, &to, offer, &state.connections).await
        }
        ClientEvent::Answer { to, answer } => {
            relay_signal(SignalKind::Answer, &connection.connection_id, &to, answer, &state.connections).await
        }
        ClientEvent::IceCandidate { to, candidate } => {
            relay_signal(SignalKind::IceCandidate, &connection.connection_id, &to, candidate, &state.connections)
                .await
        }
        ClientEvent::ChatMessage { room_id, message } => {
            handle_chat_message(
                &room_id,
                &message,
                &connection.connection_id,
                connection.user_id.as_deref(),
                &connection.username,
                &state.room_runtime,
                &state.connections,
                &state.chat_rate_limiter,
                &state.persistence,
            )
            .await
        }
        ClientEvent::ChatReaction {
            room_id,
            message_id,
            emoji,
        } => {
            handle_chat_reaction(
                &room_id,
                &message_id,
                &emoji,
                &connection.connection_id,
                connection.user_id.as_deref(),
                &connection.username,
                &state.room_runtime,
                &state.connections,
                &state.persistence,
            )
            .await
        }
        ClientEvent::ToggleMute { room_id, muted } => {
            toggle_presence(state, connection, current_room_id, &room_id, |p| p.muted = muted, |id| {
                ServerEvent::UserToggleMute { connection_id: id, muted }
            })
            .await
        }
        ClientEvent::ToggleVideo { room_id, video_off } => {
            toggle_presence(
                state,
                connection,
                current_room_id,
                &room_id,
                |p| p.video_off = video_off,
                |id| ServerEvent::UserToggleVideo { connection_id: id, video_off },
            )
            .await
        }
        ClientEvent::HandRaise { room_id, raised } => {
            let username = connection.username.clone();
            toggle_presence(
                state,
                connection,
                current_room_id,
                &room_id,
                |p| p.hand_raised = raised,
                move |id| ServerEvent::UserHandRaise { connection_id: id, username: username.clone(), raised },
            )
            .await
        }
        ClientEvent::ScreenShareStart { room_id } => {
            let username = connection.username.clone();
            toggle_presence(
                state,
                connection,
                current_room_id,
                &room_id,
                |p| p.screen_sharing = true,
                move |id| ServerEvent::UserScreenShareStart { connection_id: id, username: username.clone() },
            )
            .await
        }
        ClientEvent::ScreenShareStop { room_id } => {
            toggle_presence(
                state,
                connection,
                current_room_id,
                &room_id,
                |p| p.screen_sharing = false,
                |id| ServerEvent::UserScreenShareStop { connection_id: id },
            )
            .await
        }
        ClientEvent::ApproveUser { room_id, user_id } => {
            manage_waiting_room(state, connection, &room_id, &user_id, true).await
        }
        ClientEvent::RejectUser { room_id, user_id } => {
            manage_waiting_room(state, connection, &room_id, &user_id, false).await
        }
        ClientEvent::CreateBroadcast { broadcast_id } => {
            create_broadcast(state, connection, current_broadcast_id, broadcast_id).await
        }
        ClientEvent::JoinBroadcast { broadcast_id } => join_broadcast(state, connection, broadcast_id).await,
    }
}

async fn join_room(
    state: &AppState,
    connection: &Connection,
    current_room_id: &mut Option<String>,
    room_id: String,
) {
    if room_id.is_empty() || room_id.chars().count() > MAX_ROOM_ID_LEN {
        connection.send(ServerEvent::error("Valid roomId is required")).await;
        return;
    }

    leave_current_room(state, connection, current_room_id).await;

    let participant = ParticipantInfo::new(
        connection.connection_id.clone(),
        connection.user_id.clone(),
        connection.username.clone(),
    );
    let outcome = state.room_runtime.join_room(&room_id, participant).await;

    let joined_event = ServerEvent::UserJoined {
        connection_id: connection.connection_id.clone(),
        user_id: connection.user_id.clone(),
        username: connection.username.clone(),
    };
    for id in &outcome.other_connection_ids {
        if let Some(peer) = state.connections.get(id) {
            peer.send(joined_event.clone()).await;
        }
    }
    connection.send(ServerEvent::RoomParticipants(outcome.roster)).await;

    *current_room_id = Some(room_id);
}

/// Leave whatever room `current_room_id` names, if any, firing
/// `user-left` to the remaining participants. Clearing `current_room_id`
/// first (inside [`crate::room_runtime::RoomRuntime::leave_room`]'s
/// `None` short-circuit) is what makes a repeat call a no-op, satisfying
/// the idempotent-close invariant for both explicit `leave-room` and
/// final disconnect cleanup.
async fn leave_current_room(state: &AppState, connection: &Connection, current_room_id: &mut Option<String>) {
    let Some(room_id) = current_room_id.take() else {
        return;
    };
    if let Some(remaining) = state.room_runtime.leave_room(&room_id, &connection.connection_id).await {
        let event = ServerEvent::UserLeft {
            connection_id: connection.connection_id.clone(),
            username: connection.username.clone(),
        };
        for id in remaining {
            if let Some(peer) = state.connections.get(&id) {
                peer.send(event.clone()).await;
            }
        }
    }
}

/// Shared shape for the five presence-toggle events: mutate one flag,
/// then fan the matching `user-*` event out to everyone else in the
/// room. Silently rejected if the connection isn't currently in the
/// room it claims (`current_room_id` mismatch, or already left).
async fn toggle_presence<M, E>(
    state: &AppState,
    connection: &Connection,
    current_room_id: &Option<String>,
    claimed_room_id: &str,
    mutator: M,
    build_event: E,
) where
    M: FnOnce(&mut ParticipantInfo),
    E: FnOnce(String) -> ServerEvent,
{
    if current_room_id.as_deref() != Some(claimed_room_id) {
        return;
    }
    let Some((_, others)) = state
        .room_runtime
        .update_participant(claimed_room_id, &connection.connection_id, mutator)
        .await
    else {
        return;
    };
    let event = build_event(connection.connection_id.clone());
    for id in others {
        if let Some(peer) = state.connections.get(&id) {
            peer.send(event.clone()).await;
        }
    }
}

async fn manage_waiting_room(state: &AppState, connection: &Connection, room_id: &str, user_id: &str, approve: bool) {
    let room = match state.rooms.get_room(room_id).await {
        Ok(Some(room)) => room,
        _ => return,
    };
    if connection.user_id.as_deref() != Some(room.creator_user_id.as_str()) {
        connection
            .send(ServerEvent::error("Only room creator can manage waiting room"))
            .await;
        return;
    }

    state
        .persistence
        .enqueue(PersistenceIntent::RemoveFromWaitingRoom {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await;
    let updated_waiting_room: Vec<String> = room.waiting_room.into_iter().filter(|id| id != user_id).collect();

    let notice = if approve {
        ServerEvent::WaitingRoomApproved { room_id: room_id.to_string() }
    } else {
        ServerEvent::WaitingRoomRejected { room_id: room_id.to_string() }
    };
    for target in state.connections.find_by_user_id(user_id) {
        target.send(notice.clone()).await;
    }
    connection
        .send(ServerEvent::WaitingRoomUpdated { waiting_room: updated_waiting_room })
        .await;
}

async fn create_broadcast(
    state: &AppState,
    connection: &Connection,
    current_broadcast_id: &mut Option<String>,
    broadcast_id: String,
) {
    if broadcast_id.is_empty() || broadcast_id.chars().count() > MAX_BROADCAST_ID_LEN {
        connection.send(ServerEvent::error("Valid broadcastId is required")).await;
        return;
    }
    match state.broadcasts.create(&broadcast_id, &connection.connection_id) {
        Ok(_) => {
            *current_broadcast_id = Some(broadcast_id.clone());
            connection.send(ServerEvent::BroadcastCreated { broadcast_id }).await;
        }
        Err(_) => connection.send(ServerEvent::error("Valid broadcastId is required")).await,
    }
}

async fn join_broadcast(state: &AppState, connection: &Connection, broadcast_id: String) {
    let Some(publisher_id) = state.broadcasts.find_publisher(&broadcast_id) else {
        connection.send(ServerEvent::BroadcastNotFound { broadcast_id }).await;
        return;
    };
    if let Some(publisher) = state.connections.get(&publisher_id) {
        publisher
            .send(ServerEvent::ViewerJoined { viewer_connection_id: connection.connection_id.clone() })
            .await;
    }
    connection
        .send(ServerEvent::BroadcastJoined { publisher_connection_id: publisher_id })
        .await;
}

async fn cleanup(
    state: &AppState,
    connection: &Connection,
    mut current_room_id: Option<String>,
    current_broadcast_id: Option<String>,
) {
    leave_current_room(state, connection, &mut current_room_id).await;
    if current_broadcast_id.is_some() {
        state.broadcasts.remove_publisher(&connection.connection_id);
    }
    state.chat_rate_limiter.remove(&connection.connection_id);
    state.connections.unregister(&connection.connection_id);
    tracing::info!(connection_id = %connection.connection_id, "connection closed");
}
