//! Wire protocol, participant shapes, and ID generation for the signaling broker.
//!
//! This crate has no knowledge of sockets, databases, or the room/broadcast
//! runtimes — it only defines the message taxonomy exchanged over the wire
//! and the small set of value types shared by every layer above it.

#![forbid(unsafe_code)]

pub mod error;
pub mod ids;
pub mod participant;
pub mod wire;

pub use error::ProtocolError;
pub use participant::ParticipantInfo;
pub use wire::{ClientEvent, ServerEvent};

/// Result type for protocol-layer operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
