//! Room store: creation, lookup, chat append, reactions, waiting-room state

use crate::models::{ChatMessage, CreateRoomOptions, Room};
use crate::StoreError;
use async_trait::async_trait;
use bson::doc;
use mongodb::Collection;
use vidbridge_protocol::ids::room_id;

/// How many times `create_room` retries after an ID collision before
/// giving up and surfacing a transient error to the caller.
const MAX_ID_COLLISION_RETRIES: u32 = 5;

/// Durable room state: creation, lookup, chat history, reactions, and
/// waiting-room membership. Implemented by a MongoDB-backed store in
/// production and an in-memory fake in tests.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(
        &self,
        name: &str,
        creator_user_id: &str,
        options: CreateRoomOptions,
    ) -> Result<Room, StoreError>;

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError>;

    async fn append_chat(&self, room_id: &str, message: ChatMessage) -> Result<(), StoreError>;

    async fn add_reaction(
        &self,
        room_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), StoreError>;

    async fn add_to_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError>;

    async fn remove_from_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError>;
}

fn validate_room_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() || name.chars().count() > 50 {
        return Err(StoreError::Validation(
            "room name must be 1-50 characters".to_string(),
        ));
    }
    Ok(())
}

/// MongoDB-backed implementation of [`RoomStore`].
pub struct MongoRoomStore {
    rooms: Collection<Room>,
}

impl MongoRoomStore {
    pub fn new(rooms: Collection<Room>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl RoomStore for MongoRoomStore {
    async fn create_room(
        &self,
        name: &str,
        creator_user_id: &str,
        options: CreateRoomOptions,
    ) -> Result<Room, StoreError> {
        validate_room_name(name)?;

        // Room IDs are generated independently of any database sequence, so a
        // collision is possible (if unlikely). Retry with a fresh ID rather
        // than failing the whole create on the rare duplicate-key error.
        for _ in 0..MAX_ID_COLLISION_RETRIES {
            let room = Room {
                room_id: room_id(8),
                name: name.to_string(),
                creator_user_id: creator_user_id.to_string(),
                is_private: options.is_private,
                waiting_room_enabled: options.waiting_room_enabled,
                waiting_room: Vec::new(),
                chat_messages: Vec::new(),
            };
            match self.rooms.insert_one(&room).await {
                Ok(_) => return Ok(room),
                Err(e) if is_duplicate_key(&e) => continue,
                Err(e) => return Err(StoreError::Transient(e.to_string())),
            }
        }
        Err(StoreError::Transient(
            "exhausted room ID retries".to_string(),
        ))
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        self.rooms
            .find_one(doc! { "_id": room_id })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))
    }

    async fn append_chat(&self, room_id: &str, message: ChatMessage) -> Result<(), StoreError> {
        let message = bson::to_bson(&message).map_err(|e| StoreError::Transient(e.to_string()))?;
        let result = self
            .rooms
            .update_one(
                doc! { "_id": room_id },
                doc! { "$push": { "chat_messages": message } },
            )
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_reaction(
        &self,
        room_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let field = format!("chat_messages.$.reactions.{emoji}");
        let result = self
            .rooms
            .update_one(
                doc! { "_id": room_id, "chat_messages.message_id": message_id },
                doc! { "$addToSet": { field: user_id } },
            )
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_to_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError> {
        let result = self
            .rooms
            .update_one(
                doc! { "_id": room_id },
                doc! { "$addToSet": { "waiting_room": user_id } },
            )
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn remove_from_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError> {
        let result = self
            .rooms
            .update_one(
                doc! { "_id": room_id },
                doc! { "$pull": { "waiting_room": user_id } },
            )
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we))
            if we.code == 11000
    )
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    use super::*;
    use tokio::sync::RwLock;

    /// In-memory [`RoomStore`] fake used by unit tests.
    #[derive(Default)]
    pub struct InMemoryRoomStore {
        rooms: RwLock<Vec<Room>>,
    }

    #[async_trait]
    impl RoomStore for InMemoryRoomStore {
        async fn create_room(
            &self,
            name: &str,
            creator_user_id: &str,
            options: CreateRoomOptions,
        ) -> Result<Room, StoreError> {
            validate_room_name(name)?;
            let room = Room {
                room_id: room_id(8),
                name: name.to_string(),
                creator_user_id: creator_user_id.to_string(),
                is_private: options.is_private,
                waiting_room_enabled: options.waiting_room_enabled,
                waiting_room: Vec::new(),
                chat_messages: Vec::new(),
            };
            self.rooms.write().await.push(room.clone());
            Ok(room)
        }

        async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
            Ok(self
                .rooms
                .read()
                .await
                .iter()
                .find(|r| r.room_id == room_id)
                .cloned())
        }

        async fn append_chat(&self, room_id: &str, message: ChatMessage) -> Result<(), StoreError> {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .iter_mut()
                .find(|r| r.room_id == room_id)
                .ok_or(StoreError::NotFound)?;
            room.chat_messages.push(message);
            Ok(())
        }

        async fn add_reaction(
            &self,
            room_id: &str,
            message_id: &str,
            emoji: &str,
            user_id: &str,
        ) -> Result<(), StoreError> {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .iter_mut()
                .find(|r| r.room_id == room_id)
                .ok_or(StoreError::NotFound)?;
            let message = room
                .chat_messages
                .iter_mut()
                .find(|m| m.message_id == message_id)
                .ok_or(StoreError::NotFound)?;
            message
                .reactions
                .entry(emoji.to_string())
                .or_default()
                .insert(user_id.to_string());
            Ok(())
        }

        async fn add_to_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError> {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .iter_mut()
                .find(|r| r.room_id == room_id)
                .ok_or(StoreError::NotFound)?;
            if !room.waiting_room.iter().any(|id| id == user_id) {
                room.waiting_room.push(user_id.to_string());
            }
            Ok(())
        }

        async fn remove_from_waiting_room(&self, room_id: &str, user_id: &str) -> Result<(), StoreError> {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .iter_mut()
                .find(|r| r.room_id == room_id)
                .ok_or(StoreError::NotFound)?;
            room.waiting_room.retain(|id| id != user_id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod fake_tests {
    use super::fake::InMemoryRoomStore;
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryRoomStore::default();
        let room = store
            .create_room("Team Standup", "user-1", CreateRoomOptions::default())
            .await
            .unwrap();
        let fetched = store.get_room(&room.room_id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Team Standup");
        assert_eq!(fetched.room_id.len(), 8);
    }

    #[tokio::test]
    async fn get_unknown_room_returns_none() {
        let store = InMemoryRoomStore::default();
        assert!(store.get_room("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_empty_room_name() {
        let store = InMemoryRoomStore::default();
        let err = store
            .create_room("   ", "user-1", CreateRoomOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn append_chat_then_react_is_idempotent_per_user() {
        let store = InMemoryRoomStore::default();
        let room = store
            .create_room("Room", "user-1", CreateRoomOptions::default())
            .await
            .unwrap();
        let message = ChatMessage {
            message_id: "msg-1".to_string(),
            user_id: Some("user-1".to_string()),
            username: "alice".to_string(),
            text: "hello".to_string(),
            timestamp: chrono::Utc::now(),
            reactions: Default::default(),
        };
        store.append_chat(&room.room_id, message).await.unwrap();

        store
            .add_reaction(&room.room_id, "msg-1", "\u{1F44D}", "user-2")
            .await
            .unwrap();
        store
            .add_reaction(&room.room_id, "msg-1", "\u{1F44D}", "user-2")
            .await
            .unwrap();

        let fetched = store.get_room(&room.room_id).await.unwrap().unwrap();
        let reactors = &fetched.chat_messages[0].reactions["\u{1F44D}"];
        assert_eq!(reactors.len(), 1);
    }

    #[tokio::test]
    async fn waiting_room_add_remove() {
        let store = InMemoryRoomStore::default();
        let room = store
            .create_room(
                "Room",
                "user-1",
                CreateRoomOptions {
                    is_private: true,
                    waiting_room_enabled: true,
                },
            )
            .await
            .unwrap();
        store
            .add_to_waiting_room(&room.room_id, "user-2")
            .await
            .unwrap();
        let fetched = store.get_room(&room.room_id).await.unwrap().unwrap();
        assert_eq!(fetched.waiting_room, vec!["user-2".to_string()]);

        store
            .remove_from_waiting_room(&room.room_id, "user-2")
            .await
            .unwrap();
        let fetched = store.get_room(&room.room_id).await.unwrap().unwrap();
        assert!(fetched.waiting_room.is_empty());
    }
}
