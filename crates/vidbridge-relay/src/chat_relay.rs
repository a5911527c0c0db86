//! Rate-limited chat fan-out with fire-and-forget persistence.

use std::collections::HashMap;

use chrono::Utc;
use vidbridge_protocol::ids::message_id;
use vidbridge_protocol::ServerEvent;
use vidbridge_store::models::ChatMessage;

use crate::connection::ConnectionRegistry;
use crate::persistence_queue::{PersistenceIntent, PersistenceQueue};
use crate::rate_limit::ChatRateLimiter;
use crate::room_runtime::RoomRuntime;

const MAX_MESSAGE_LEN: usize = 1000;
const MAX_EMOJI_LEN: usize = 10;

/// Handle an inbound `chat-message`. Validates, rate-limits, fans out to
/// every connection in the room (including the sender), and enqueues the
/// durable write without waiting on it.
pub async fn handle_chat_message(
    room_id: &str,
    text: &str,
    sender_connection_id: &str,
    sender_user_id: Option<&str>,
    sender_username: &str,
    room_runtime: &RoomRuntime,
    connections: &ConnectionRegistry,
    rate_limiter: &ChatRateLimiter,
    persistence: &PersistenceQueue,
) {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_MESSAGE_LEN {
        if let Some(sender) = connections.get(sender_connection_id) {
            sender
                .send(ServerEvent::error("Valid chat message is required"))
                .await;
        }
        return;
    }

    if !rate_limiter.check(sender_connection_id.to_string()) {
        if let Some(sender) = connections.get(sender_connection_id) {
            sender
                .send(ServerEvent::error("Chat rate limit exceeded. Slow down."))
                .await;
        }
        return;
    }

    let timestamp = Utc::now();
    let message = ChatMessage {
        message_id: message_id(),
        user_id: sender_user_id.map(str::to_string),
        username: sender_username.to_string(),
        text: trimmed.to_string(),
        timestamp,
        reactions: Default::default(),
    };

    persistence
        .enqueue(PersistenceIntent::AppendChat {
            room_id: room_id.to_string(),
            message: message.clone(),
        })
        .await;

    let event = ServerEvent::ChatMessage {
        message_id: message.message_id,
        user_id: message.user_id,
        username: message.username,
        message: message.text,
        timestamp,
        reactions: HashMap::new(),
    };

    for connection_id in room_runtime.connection_ids(room_id).await {
        if let Some(conn) = connections.get(&connection_id) {
            conn.send(event.clone()).await;
        }
    }
}

/// Handle an inbound `chat-reaction`. Requires authentication; emoji
/// length is bounded the same as the Envelope Validator bounds payload
/// size -- an over-long emoji is rejected silently rather than with an
/// `error-message`, since the spec gives no literal wording for that
/// case (unlike the auth-required rejection, which does).
pub async fn handle_chat_reaction(
    room_id: &str,
    message_id_arg: &str,
    emoji: &str,
    sender_connection_id: &str,
    sender_user_id: Option<&str>,
    sender_username: &str,
    room_runtime: &RoomRuntime,
    connections: &ConnectionRegistry,
    persistence: &PersistenceQueue,
) {
    let Some(user_id) = sender_user_id else {
        if let Some(sender) = connections.get(sender_connection_id) {
            sender
                .send(ServerEvent::error("Must be authenticated to react"))
                .await;
        }
        return;
    };

    if emoji.chars().count() > MAX_EMOJI_LEN {
        return;
    }

    persistence
        .enqueue(PersistenceIntent::AddReaction {
            room_id: room_id.to_string(),
            message_id: message_id_arg.to_string(),
            emoji: emoji.to_string(),
            user_id: user_id.to_string(),
        })
        .await;

    let event = ServerEvent::ChatReaction {
        message_id: message_id_arg.to_string(),
        emoji: emoji.to_string(),
        user_id: user_id.to_string(),
        username: sender_username.to_string(),
    };

    for connection_id in room_runtime.connection_ids(room_id).await {
        if let Some(conn) = connections.get(&connection_id) {
            conn.send(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, OUTBOUND_CHANNEL_CAPACITY};
    use crate::rate_limit::new_chat_rate_limiter;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use vidbridge_protocol::ParticipantInfo;

    async fn join(runtime: &RoomRuntime, registry: &ConnectionRegistry, id: &str) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        registry.register(Arc::new(Connection::new(id.to_string(), None, "u".to_string(), tx)));
        runtime
            .join_room("room-1", ParticipantInfo::new(id.to_string(), None, "u".to_string()))
            .await;
        rx
    }

    #[tokio::test]
    async fn fans_out_to_room_including_sender() {
        let runtime = RoomRuntime::new();
        let connections = ConnectionRegistry::new();
        let limiter = new_chat_rate_limiter();
        let persistence = PersistenceQueue::new();
        let mut rx1 = join(&runtime, &connections, "c1").await;
        let mut rx2 = join(&runtime, &connections, "c2").await;

        handle_chat_message(
            "room-1",
            "hello",
            "c1",
            None,
            "alice",
            &runtime,
            &connections,
            &limiter,
            &persistence,
        )
        .await;

        assert!(matches!(rx1.recv().await.unwrap(), ServerEvent::ChatMessage { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), ServerEvent::ChatMessage { .. }));
    }

    #[tokio::test]
    async fn rejects_empty_message() {
        let runtime = RoomRuntime::new();
        let connections = ConnectionRegistry::new();
        let limiter = new_chat_rate_limiter();
        let persistence = PersistenceQueue::new();
        let mut rx = join(&runtime, &connections, "c1").await;

        handle_chat_message(
            "room-1", "   ", "c1", None, "alice", &runtime, &connections, &limiter, &persistence,
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerEvent::ErrorMessage { message } => assert_eq!(message, "Valid chat message is required"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn eleventh_message_is_rate_limited() {
        let runtime = RoomRuntime::new();
        let connections = ConnectionRegistry::new();
        let limiter = new_chat_rate_limiter();
        let persistence = PersistenceQueue::new();
        let mut rx = join(&runtime, &connections, "c1").await;

        for _ in 0..10 {
            handle_chat_message(
                "room-1", "hi", "c1", None, "alice", &runtime, &connections, &limiter, &persistence,
            )
            .await;
            rx.recv().await.unwrap();
        }
        handle_chat_message(
            "room-1", "hi", "c1", None, "alice", &runtime, &connections, &limiter, &persistence,
        )
        .await;
        match rx.recv().await.unwrap() {
            ServerEvent::ErrorMessage { message } => {
                assert_eq!(message, "Chat rate limit exceeded. Slow down.");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reaction_requires_authentication() {
        let runtime = RoomRuntime::new();
        let connections = ConnectionRegistry::new();
        let persistence = PersistenceQueue::new();
        let mut rx = join(&runtime, &connections, "c1").await;

        handle_chat_reaction(
            "room-1", "m1", "\u{1F44D}", "c1", None, "guest", &runtime, &connections, &persistence,
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerEvent::ErrorMessage { message } => assert_eq!(message, "Must be authenticated to react"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn authenticated_reaction_fans_out() {
        let runtime = RoomRuntime::new();
        let connections = ConnectionRegistry::new();
        let persistence = PersistenceQueue::new();
        let mut rx1 = join(&runtime, &connections, "c1").await;
        let mut rx2 = join(&runtime, &connections, "c2").await;

        handle_chat_reaction(
            "room-1",
            "m1",
            "\u{1F44D}",
            "c1",
            Some("u1"),
            "harry",
            &runtime,
            &connections,
            &persistence,
        )
        .await;

        assert!(matches!(rx1.recv().await.unwrap(), ServerEvent::ChatReaction { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), ServerEvent::ChatReaction { .. }));
    }
}
