//! Storage-layer error types

use thiserror::Error;

/// Errors raised by the credential store, room store, or token service.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed input rejected before it ever reaches persistence
    #[error("validation error: {0}")]
    Validation(String),

    /// Credentials did not match any user, or the password was wrong
    #[error("unauthorized")]
    Unauthorized,

    /// Email or username already registered
    #[error("conflict: {0}")]
    Conflict(String),

    /// No record matched the requested ID
    #[error("not found")]
    NotFound,

    /// The underlying document database rejected or failed the operation.
    /// Callers on the chat/waiting-room path log this and proceed — the
    /// spec treats these writes as fire-and-forget.
    #[error("transient store failure: {0}")]
    Transient(String),
}
