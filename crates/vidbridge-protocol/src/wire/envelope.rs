//! Opaque signaling payloads and the envelope size bound
//!
//! The broker relays `offer`/`answer`/`candidate` payloads without ever
//! interpreting their contents. They're modeled as
//! `serde_json::Value` so arbitrary SDP/ICE shapes round-trip byte-for-byte
//! without this crate needing to know WebRTC's schema.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum serialized size of a relayed signaling envelope: 64 KiB.
pub const MAX_ENVELOPE_BYTES: usize = 65_536;

/// An opaque signaling payload (SDP offer/answer body, or ICE candidate).
///
/// `null` is accepted by `serde_json` as a valid `Value`, so emptiness is
/// checked explicitly in [`validate_envelope`] rather than rejected at
/// deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalingPayload(Value);

impl SignalingPayload {
    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for SignalingPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Validate a signaling payload against the envelope bound.
///
/// Rejects a `null`/missing payload, and rejects (or fails to serialize)
/// anything over [`MAX_ENVELOPE_BYTES`]. Callers are expected to drop
/// invalid envelopes silently rather than surface the error to the sender,
/// to avoid turning a malformed frame into an amplification vector.
pub fn validate_envelope(payload: &SignalingPayload) -> Result<(), ProtocolError> {
    if payload.0.is_null() {
        return Err(ProtocolError::EmptyEnvelope);
    }
    let serialized =
        serde_json::to_vec(&payload.0).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if serialized.len() > MAX_ENVELOPE_BYTES {
        return Err(ProtocolError::EnvelopeTooLarge {
            size: serialized.len(),
            limit: MAX_ENVELOPE_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_small_payload() {
        let payload = SignalingPayload::from(json!({"type": "offer", "sdp": "v=0"}));
        assert!(validate_envelope(&payload).is_ok());
    }

    #[test]
    fn rejects_null_payload() {
        let payload = SignalingPayload::from(Value::Null);
        assert_eq!(validate_envelope(&payload), Err(ProtocolError::EmptyEnvelope));
    }

    #[test]
    fn rejects_oversized_payload() {
        let huge = "x".repeat(100_000);
        let payload = SignalingPayload::from(json!({"sdp": huge}));
        let err = validate_envelope(&payload).unwrap_err();
        match err {
            ProtocolError::EnvelopeTooLarge { size, limit } => {
                assert!(size > limit);
                assert_eq!(limit, MAX_ENVELOPE_BYTES);
            }
            other => panic!("expected EnvelopeTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn accepts_payload_right_at_boundary() {
        // Construct a payload whose serialized form lands just under the limit.
        let filler = "x".repeat(MAX_ENVELOPE_BYTES - 20);
        let payload = SignalingPayload::from(json!({"s": filler}));
        assert!(validate_envelope(&payload).is_ok());
    }
}
