//! Fire-and-forget persistence for chat and waiting-room writes.
//!
//! Relay handlers enqueue an intent and move on without waiting on the
//! document database. A single background task drains the queue and
//! applies each intent to the `RoomStore`; on overflow the oldest queued
//! intent is dropped (and logged) rather than back-pressuring the relay.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use vidbridge_store::models::ChatMessage;
use vidbridge_store::RoomStore;

/// Bound on queued intents before the oldest is dropped.
const QUEUE_CAPACITY: usize = 1024;

pub enum PersistenceIntent {
    AppendChat {
        room_id: String,
        message: ChatMessage,
    },
    AddReaction {
        room_id: String,
        message_id: String,
        emoji: String,
        user_id: String,
    },
    AddToWaitingRoom {
        room_id: String,
        user_id: String,
    },
    RemoveFromWaitingRoom {
        room_id: String,
        user_id: String,
    },
}

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<PersistenceIntent>>,
    notify: Notify,
}

/// Handle shared by every caller that wants to enqueue a persistence
/// intent. Cloning is cheap (it's an `Arc` internally).
#[derive(Clone)]
pub struct PersistenceQueue {
    inner: Arc<Inner>,
}

impl PersistenceQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Enqueue an intent. Never blocks or fails from the caller's
    /// perspective -- overflow silently drops the oldest entry.
    pub async fn enqueue(&self, intent: PersistenceIntent) {
        let mut queue = self.inner.queue.lock().await;
        if queue.len() >= QUEUE_CAPACITY {
            queue.pop_front();
            tracing::warn!("persistence queue full, dropped oldest intent");
        }
        queue.push_back(intent);
        self.inner.notify.notify_one();
    }

    /// Run the drain loop until the queue (and every sender) is dropped.
    /// Intended to be spawned once at process start.
    pub async fn run(self, store: Arc<dyn RoomStore>) {
        loop {
            let intent = {
                let mut queue = self.inner.queue.lock().await;
                queue.pop_front()
            };
            let Some(intent) = intent else {
                self.inner.notify.notified().await;
                continue;
            };
            apply(&store, intent).await;
        }
    }
}

impl Default for PersistenceQueue {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply(store: &Arc<dyn RoomStore>, intent: PersistenceIntent) {
    let result = match intent {
        PersistenceIntent::AppendChat { room_id, message } => {
            store.append_chat(&room_id, message).await
        }
        PersistenceIntent::AddReaction {
            room_id,
            message_id,
            emoji,
            user_id,
        } => store.add_reaction(&room_id, &message_id, &emoji, &user_id).await,
        PersistenceIntent::AddToWaitingRoom { room_id, user_id } => {
            store.add_to_waiting_room(&room_id, &user_id).await
        }
        PersistenceIntent::RemoveFromWaitingRoom { room_id, user_id } => {
            store.remove_from_waiting_room(&room_id, &user_id).await
        }
    };
    if let Err(err) = result {
        tracing::warn!(error = %err, "persistence intent failed, not surfaced to clients");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vidbridge_store::models::CreateRoomOptions;
    use vidbridge_store::rooms::fake::InMemoryRoomStore;

    #[tokio::test]
    async fn enqueued_chat_is_eventually_persisted() {
        let store: Arc<dyn RoomStore> = Arc::new(InMemoryRoomStore::default());
        let room = store
            .create_room("Room", "creator", CreateRoomOptions::default())
            .await
            .unwrap();

        let queue = PersistenceQueue::new();
        let writer = tokio::spawn(queue.clone().run(Arc::clone(&store)));

        queue
            .enqueue(PersistenceIntent::AppendChat {
                room_id: room.room_id.clone(),
                message: ChatMessage {
                    message_id: "m1".to_string(),
                    user_id: None,
                    username: "guest".to_string(),
                    text: "hi".to_string(),
                    timestamp: Utc::now(),
                    reactions: Default::default(),
                },
            })
            .await;

        // Give the background writer a chance to drain.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        writer.abort();

        let fetched = store.get_room(&room.room_id).await.unwrap().unwrap();
        assert_eq!(fetched.chat_messages.len(), 1);
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let queue = PersistenceQueue::new();
        for i in 0..QUEUE_CAPACITY + 1 {
            queue
                .enqueue(PersistenceIntent::AddToWaitingRoom {
                    room_id: "room".to_string(),
                    user_id: format!("c{i}"),
                })
                .await;
        }
        let len = queue.inner.queue.lock().await.len();
        assert_eq!(len, QUEUE_CAPACITY);
    }
}
