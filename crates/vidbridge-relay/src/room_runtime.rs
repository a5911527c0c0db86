//! In-memory room roster: presence tracking and fan-out target selection.
//!
//! Participant state for a single room is gated by one `tokio::sync::Mutex`
//! per room entry, held only long enough to mutate the map and take a
//! snapshot. Every caller clones the snapshot and releases the lock before
//! sending anything, so no connection's outbound send can block another
//! room's mutation.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use vidbridge_protocol::ParticipantInfo;

#[derive(Default)]
struct RoomEntry {
    participants: HashMap<String, ParticipantInfo>,
}

/// Result of a successful `join_room`.
pub struct JoinOutcome {
    /// Full roster at the moment of join, including the new joiner --
    /// sent to the joiner only as `room-participants`.
    pub roster: Vec<ParticipantInfo>,
    /// Every other connection in the room, to receive `user-joined`.
    pub other_connection_ids: Vec<String>,
}

/// Shared, concurrent room roster keyed by `roomId`.
#[derive(Default)]
pub struct RoomRuntime {
    rooms: DashMap<String, Arc<Mutex<RoomEntry>>>,
}

impl RoomRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection_id` to `room_id`'s roster with default presence
    /// flags. Returns the roster snapshot and the other participants to
    /// notify.
    pub async fn join_room(
        &self,
        room_id: &str,
        participant: ParticipantInfo,
    ) -> JoinOutcome {
        let room = self.room_entry(room_id);
        let mut guard = room.lock().await;

        let other_connection_ids: Vec<String> = guard.participants.keys().cloned().collect();
        guard.participants.insert(participant.connection_id.clone(), participant);
        let roster: Vec<ParticipantInfo> = guard.participants.values().cloned().collect();

        JoinOutcome {
            roster,
            other_connection_ids,
        }
    }

    /// Remove `connection_id` from `room_id`'s roster. Returns the
    /// remaining participants to notify with `user-left`, or `None` if
    /// the connection wasn't in that room's roster (already removed, or
    /// never joined -- callers treat this as the idempotent-close case).
    pub async fn leave_room(&self, room_id: &str, connection_id: &str) -> Option<Vec<String>> {
        let room = self.rooms.get(room_id).map(|r| r.clone())?;

        let (removed, remaining, is_empty) = {
            let mut guard = room.lock().await;
            let removed = guard.participants.remove(connection_id).is_some();
            let remaining: Vec<String> = guard.participants.keys().cloned().collect();
            (removed, remaining, guard.participants.is_empty())
        };

        if !removed {
            return None;
        }

        // Racing with a concurrent join is possible between the lock release
        // above and this remove: the worst case is a room entry briefly
        // surviving with zero participants, cleaned up by the next leave.
        if is_empty {
            self.rooms.remove(room_id);
        }

        Some(remaining)
    }

    /// Mutate one participant's presence flags via `mutator`, returning
    /// the other participants to notify. Returns `None` if `connection_id`
    /// is not currently in `room_id`'s roster (the caller silently drops
    /// the event in that case).
    pub async fn update_participant<F>(
        &self,
        room_id: &str,
        connection_id: &str,
        mutator: F,
    ) -> Option<(ParticipantInfo, Vec<String>)>
    where
        F: FnOnce(&mut ParticipantInfo),
    {
        let room = self.rooms.get(room_id).map(|r| r.clone())?;
        let mut guard = room.lock().await;
        let participant = guard.participants.get_mut(connection_id)?;
        mutator(participant);
        let updated = participant.clone();
        let others: Vec<String> = guard
            .participants
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        Some((updated, others))
    }

    /// Every connection currently in `room_id`'s roster, for handlers
    /// (chat fan-out) that address the whole room rather than "everyone
    /// but the sender".
    pub async fn connection_ids(&self, room_id: &str) -> Vec<String> {
        let Some(room) = self.rooms.get(room_id).map(|r| r.clone()) else {
            return Vec::new();
        };
        let guard = room.lock().await;
        guard.participants.keys().cloned().collect()
    }

    /// Number of live rooms, reported by the health endpoint.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn room_entry(&self, room_id: &str) -> Arc<Mutex<RoomEntry>> {
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RoomEntry::default())))
            .clone()
    }
}
