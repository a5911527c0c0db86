//! Wire message taxonomy for the broker ↔ browser message channel
//!
//! The channel is "JSON-encoded frames with a named event plus a single
//! object argument". That's represented here as an
//! adjacently-tagged enum: `{ "type": "<event-name>", "data": <argument> }`.
//! Adjacent tagging (rather than merging the tag into the argument) is
//! what lets `room-participants` carry a bare JSON array as its argument
//! instead of an object.

pub mod envelope;
pub mod inbound;
pub mod outbound;

pub use envelope::{validate_envelope, SignalingPayload, MAX_ENVELOPE_BYTES};
pub use inbound::ClientEvent;
pub use outbound::ServerEvent;
