//! Durable storage layer for the signaling broker
//!
//! Owns the user and room document collections, bearer token issuance, and
//! the password hashing policy. Everything here is accessed through a
//! trait (`CredentialStore`, `RoomStore`) so the relay can be built and
//! tested against an in-memory fake without a live database.

#![forbid(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod models;
pub mod rooms;
pub mod token;

pub use credentials::{CredentialStore, MongoCredentialStore};
pub use error::StoreError;
pub use rooms::{MongoRoomStore, RoomStore};
pub use token::TokenService;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
