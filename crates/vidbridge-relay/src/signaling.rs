//! Point-to-point relay of `offer`/`answer`/`ice-candidate` envelopes.
//!
//! Purely a lookup-and-forward: the broker never interprets SDP or ICE
//! payload contents, only bounds their serialized size.

use vidbridge_protocol::wire::{validate_envelope, SignalingPayload};
use vidbridge_protocol::ServerEvent;

use crate::connection::ConnectionRegistry;

/// Which of the three signaling events this is, so [`relay`] can build
/// the matching outbound variant.
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Forward `payload` from `from_connection_id` to `to_connection_id`.
///
/// Invalid envelopes (oversized, null) and envelopes addressed to a
/// connection that's no longer present are both dropped silently -- the
/// sender never learns which case occurred, matching the "no error sent
/// to sender" relay contract.
pub async fn relay(
    kind: SignalKind,
    from_connection_id: &str,
    to_connection_id: &str,
    payload: SignalingPayload,
    connections: &ConnectionRegistry,
) {
    if validate_envelope(&payload).is_err() {
        return;
    }
    let Some(target) = connections.get(to_connection_id) else {
        return;
    };
    let event = match kind {
        SignalKind::Offer => ServerEvent::Offer {
            from: from_connection_id.to_string(),
            offer: payload,
        },
        SignalKind::Answer => ServerEvent::Answer {
            from: from_connection_id.to_string(),
            answer: payload,
        },
        SignalKind::IceCandidate => ServerEvent::IceCandidate {
            from: from_connection_id.to_string(),
            candidate: payload,
        },
    };
    target.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, OUTBOUND_CHANNEL_CAPACITY};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn register(registry: &ConnectionRegistry, id: &str) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        registry.register(Arc::new(Connection::new(id.to_string(), None, "u".to_string(), tx)));
        rx
    }

    #[tokio::test]
    async fn forwards_to_present_target() {
        let registry = ConnectionRegistry::new();
        let mut rx = register(&registry, "c2");
        relay(
            SignalKind::Offer,
            "c1",
            "c2",
            SignalingPayload::from(json!({"sdp": "v=0"})),
            &registry,
        )
        .await;
        let event = rx.recv().await.unwrap();
        match event {
            ServerEvent::Offer { from, .. } => assert_eq!(from, "c1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn drops_silently_when_target_absent() {
        let registry = ConnectionRegistry::new();
        relay(
            SignalKind::Answer,
            "c1",
            "ghost",
            SignalingPayload::from(json!({"sdp": "v=0"})),
            &registry,
        )
        .await;
        // No panic, no observable effect -- nothing to assert beyond completion.
    }

    #[tokio::test]
    async fn drops_oversized_envelope() {
        let registry = ConnectionRegistry::new();
        let mut rx = register(&registry, "c2");
        let huge = "x".repeat(100_000);
        relay(
            SignalKind::IceCandidate,
            "c1",
            "c2",
            SignalingPayload::from(json!({"c": huge})),
            &registry,
        )
        .await;
        assert!(rx.try_recv().is_err());
    }
}
