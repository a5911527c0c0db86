//! One-to-one publisher/viewer rendezvous, keyed by an opaque broadcast ID.
//!
//! Purely a lookup table -- no room state, no roster. Per-key mutation is
//! naturally serialized by `DashMap`'s sharded entry API, so no extra lock
//! is needed on top of it.

use dashmap::DashMap;

const MAX_BROADCAST_ID_LEN: usize = 64;

/// Whether `create_broadcast` registered a new publisher or replaced the
/// caller's own prior registration under the same ID.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Registered,
    Idempotent,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreateError {
    /// Empty ID, too long, or already claimed by a different connection.
    /// Deliberately generic so a caller can't probe which broadcastIds
    /// are taken by a connection other than their own.
    InvalidOrTaken,
}

/// Shared `broadcastId -> connectionId` table.
#[derive(Default)]
pub struct BroadcastRegistry {
    publishers: DashMap<String, String>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection_id` as the publisher for `broadcast_id`.
    /// Replaces an existing registration only if it already belongs to
    /// the same connection (idempotent re-create); otherwise rejected.
    pub fn create(
        &self,
        broadcast_id: &str,
        connection_id: &str,
    ) -> Result<CreateOutcome, CreateError> {
        if broadcast_id.is_empty() || broadcast_id.chars().count() > MAX_BROADCAST_ID_LEN {
            return Err(CreateError::InvalidOrTaken);
        }

        match self.publishers.get(broadcast_id) {
            Some(existing) if existing.as_str() == connection_id => {
                return Ok(CreateOutcome::Idempotent);
            }
            Some(_) => return Err(CreateError::InvalidOrTaken),
            None => {}
        }

        self.publishers
            .insert(broadcast_id.to_string(), connection_id.to_string());
        Ok(CreateOutcome::Registered)
    }

    /// Look up the publisher currently registered for `broadcast_id`.
    pub fn find_publisher(&self, broadcast_id: &str) -> Option<String> {
        self.publishers.get(broadcast_id).map(|v| v.clone())
    }

    /// Remove `connection_id`'s registration, if any. No notification is
    /// sent on removal -- the viewer side has no persistent channel back
    /// to the registry once rendezvous has happened.
    pub fn remove_publisher(&self, connection_id: &str) {
        self.publishers.retain(|_, v| v != connection_id);
    }
}
