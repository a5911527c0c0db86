//! Per-connection, per-room presence state

use serde::{Deserialize, Serialize};

/// The presence flags and identity the broker tracks for one connection
/// inside one room's roster.
///
/// Flags default to `false` on join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    /// Broker-assigned connection ID
    pub connection_id: String,
    /// Stable user ID, absent for guests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name (assigned or synthesized)
    pub username: String,
    /// Muted audio
    pub muted: bool,
    /// Camera off
    pub video_off: bool,
    /// Hand raised
    pub hand_raised: bool,
    /// Sharing screen
    pub screen_sharing: bool,
}

impl ParticipantInfo {
    /// Construct a freshly-joined participant with all flags cleared.
    pub fn new(connection_id: String, user_id: Option<String>, username: String) -> Self {
        Self {
            connection_id,
            user_id,
            username,
            muted: false,
            video_off: false,
            hand_raised: false,
            screen_sharing: false,
        }
    }
}
