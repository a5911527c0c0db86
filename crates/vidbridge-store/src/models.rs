//! Persistent domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A persistent user identity.
///
/// Mutated only through the credential REST surface.
/// `password_hash` is never serialized back out to a client — see
/// [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The view of a [`User`] that's safe to hand to a client: no password
/// hash, no internal version counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

/// A single chat message embedded in a [`Room`]'s append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Emoji -> set of user IDs that reacted with it. A user reacting
    /// twice with the same emoji is a no-op.
    #[serde(default)]
    pub reactions: HashMap<String, HashSet<String>>,
}

/// The view of a [`ChatMessage`] returned from the REST room lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicChatMessage {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: HashMap<String, HashSet<String>>,
}

impl From<&ChatMessage> for PublicChatMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            message_id: message.message_id.clone(),
            user_id: message.user_id.clone(),
            username: message.username.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
            reactions: message.reactions.clone(),
        }
    }
}

/// Options accepted when creating a room via REST.
#[derive(Debug, Clone, Default)]
pub struct CreateRoomOptions {
    pub is_private: bool,
    pub waiting_room_enabled: bool,
}

/// A persistent room container.
///
/// `waiting_room` holds `userId`s, not connection IDs: waiting-room
/// membership outlives any single socket connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id")]
    pub room_id: String,
    pub name: String,
    pub creator_user_id: String,
    pub is_private: bool,
    pub waiting_room_enabled: bool,
    pub waiting_room: Vec<String>,
    pub chat_messages: Vec<ChatMessage>,
}

/// The view of a [`Room`] that's safe to hand to a REST client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoom {
    pub room_id: String,
    pub name: String,
    pub creator_user_id: String,
    pub is_private: bool,
    pub waiting_room_enabled: bool,
    pub waiting_room: Vec<String>,
    pub chat_messages: Vec<PublicChatMessage>,
}

impl From<&Room> for PublicRoom {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.room_id.clone(),
            name: room.name.clone(),
            creator_user_id: room.creator_user_id.clone(),
            is_private: room.is_private,
            waiting_room_enabled: room.waiting_room_enabled,
            waiting_room: room.waiting_room.clone(),
            chat_messages: room.chat_messages.iter().map(PublicChatMessage::from).collect(),
        }
    }
}
