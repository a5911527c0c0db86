//! Per-socket connection state and the registry used to look connections
//! up by ID for point-to-point relay and waiting-room notifications.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use vidbridge_protocol::ServerEvent;

/// Outbound channel to one connected socket. Bounded so a slow or wedged
/// client can't grow the broker's memory without limit -- full channels
/// simply drop the event rather than block the sender.
pub type OutboundSender = mpsc::Sender<ServerEvent>;
pub type OutboundReceiver = mpsc::Receiver<ServerEvent>;

/// Depth of the per-connection outbound channel.
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// A live bidirectional channel to one browser. Identity is fixed for
/// the connection's life; `currentRoomId`/`currentBroadcastId` are not
/// tracked here -- they're owned by the task driving this connection's
/// socket loop, since that task is the sole mutator of its own
/// room/broadcast membership.
pub struct Connection {
    pub connection_id: String,
    pub user_id: Option<String>,
    pub username: String,
    pub authenticated: bool,
    pub outbound: OutboundSender,
}

impl Connection {
    pub fn new(
        connection_id: String,
        user_id: Option<String>,
        username: String,
        outbound: OutboundSender,
    ) -> Self {
        Self {
            authenticated: user_id.is_some(),
            connection_id,
            user_id,
            username,
            outbound,
        }
    }

    /// Best-effort send; a full or closed channel just drops the event,
    /// matching the fan-out-outside-the-lock model used everywhere else.
    pub async fn send(&self, event: ServerEvent) {
        if self.outbound.send(event).await.is_err() {
            tracing::debug!(connection_id = %self.connection_id, "outbound channel closed");
        }
    }
}

/// Process-wide lookup table from `connectionId` to the live connection,
/// used by signaling relay, chat fan-out, and waiting-room notification.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection: Arc<Connection>) {
        self.connections.insert(connection.connection_id.clone(), connection);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    pub fn get(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|c| c.clone())
    }

    /// Every connection currently authenticated as `user_id`. A user can
    /// have more than one live connection; waiting-room approval/rejection
    /// notifies all of them.
    pub fn find_by_user_id(&self, user_id: &str) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id.as_deref() == Some(user_id))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(id: &str, user_id: Option<&str>) -> (Arc<Connection>, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let conn = Arc::new(Connection::new(
            id.to_string(),
            user_id.map(str::to_string),
            "name".to_string(),
            tx,
        ));
        (conn, rx)
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = make_connection("c1", None);
        registry.register(conn);
        assert!(registry.get("c1").is_some());
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = make_connection("c1", None);
        registry.register(conn);
        registry.unregister("c1");
        assert!(registry.get("c1").is_none());
    }

    #[test]
    fn find_by_user_id_returns_all_matching_connections() {
        let registry = ConnectionRegistry::new();
        let (c1, _rx1) = make_connection("c1", Some("u1"));
        let (c2, _rx2) = make_connection("c2", Some("u1"));
        let (c3, _rx3) = make_connection("c3", Some("u2"));
        registry.register(c1);
        registry.register(c2);
        registry.register(c3);

        let matches = registry.find_by_user_id("u1");
        assert_eq!(matches.len(), 2);
    }
}
