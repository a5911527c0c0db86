//! Protocol-layer error types

use thiserror::Error;

/// Errors raised while decoding or validating a wire message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame did not parse as any known client/server event
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A signaling envelope's serialized size exceeded the bound
    #[error("envelope too large: {size} bytes (limit {limit})")]
    EnvelopeTooLarge {
        /// Serialized size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// A signaling envelope carried a null/undefined payload
    #[error("envelope payload is empty")]
    EmptyEnvelope,

    /// JSON encoding of an outbound event failed
    #[error("encode error: {0}")]
    Encode(String),
}
