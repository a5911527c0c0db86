//! Unbiased ID generation for rooms, connections, short-lived handles,
//! and chat messages.
//!
//! All generators draw from [`rand::rngs::OsRng`], the process CSPRNG.
//! `room_id` uses rejection sampling over the alphanumeric alphabet so
//! that every character is uniformly distributed — a naive `byte % 62`
//! would bias the low end of the alphabet since 256 is not a multiple
//! of 62.

use rand::{rngs::OsRng, RngCore};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ALPHANUMERIC_LEN: u8 = 62;
/// Largest multiple of 62 that fits in a byte; bytes at or above this are
/// discarded so every surviving byte maps onto the alphabet without bias.
const REJECTION_CEIL: u8 = (256 / ALPHANUMERIC_LEN as u16 * ALPHANUMERIC_LEN as u16) as u8;

/// Generate a uniform alphanumeric room ID of the given length.
///
/// Used for newly-created rooms (length 8), but the length is a
/// parameter since `join-room` must also accept longer legacy IDs.
pub fn room_id(length: usize) -> String {
    let mut out = String::with_capacity(length);
    let mut buf = [0u8; 1];
    while out.len() < length {
        OsRng.fill_bytes(&mut buf);
        if buf[0] >= REJECTION_CEIL {
            continue;
        }
        let idx = (buf[0] % ALPHANUMERIC_LEN) as usize;
        out.push(ALPHANUMERIC[idx] as char);
    }
    out
}

/// Generate a uniform hex string from `bytes` bytes of CSPRNG output.
///
/// Used for short opaque handles: guest username suffixes (`bytes = 3`,
/// 6 hex chars), chat message IDs (`bytes = 6`, 12 hex chars), and
/// connection IDs (`bytes = 16`).
pub fn short_id(bytes: usize) -> String {
    let mut raw = vec![0u8; bytes];
    OsRng.fill_bytes(&mut raw);
    raw.iter().fold(String::with_capacity(bytes * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Generate a fresh broker-assigned connection ID.
pub fn connection_id() -> String {
    short_id(16)
}

/// Generate a fresh chat message ID (12 hex characters).
pub fn message_id() -> String {
    short_id(6)
}

/// Generate a guest username of the form `Guest_<6 hex chars>`.
pub fn guest_username() -> String {
    format!("Guest_{}", short_id(3))
}
