//! Broker → client events

use super::envelope::SignalingPayload;
use crate::ParticipantInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Every event shape the broker may send on the message channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent to a joiner only, right after it joins a room.
    RoomParticipants(Vec<ParticipantInfo>),
    UserJoined {
        #[serde(rename = "connectionId")]
        connection_id: String,
        #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        username: String,
    },
    UserLeft {
        #[serde(rename = "connectionId")]
        connection_id: String,
        username: String,
    },
    Offer {
        from: String,
        offer: SignalingPayload,
    },
    Answer {
        from: String,
        answer: SignalingPayload,
    },
    IceCandidate {
        from: String,
        candidate: SignalingPayload,
    },
    ChatMessage {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        username: String,
        message: String,
        timestamp: DateTime<Utc>,
        reactions: HashMap<String, Vec<String>>,
    },
    ChatReaction {
        #[serde(rename = "messageId")]
        message_id: String,
        emoji: String,
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
    },
    UserToggleMute {
        #[serde(rename = "connectionId")]
        connection_id: String,
        muted: bool,
    },
    UserToggleVideo {
        #[serde(rename = "connectionId")]
        connection_id: String,
        #[serde(rename = "videoOff")]
        video_off: bool,
    },
    UserScreenShareStart {
        #[serde(rename = "connectionId")]
        connection_id: String,
        username: String,
    },
    UserScreenShareStop {
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
    UserHandRaise {
        #[serde(rename = "connectionId")]
        connection_id: String,
        username: String,
        raised: bool,
    },
    WaitingRoomApproved {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    WaitingRoomRejected {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    WaitingRoomUpdated {
        #[serde(rename = "waitingRoom")]
        waiting_room: Vec<String>,
    },
    BroadcastCreated {
        #[serde(rename = "broadcastId")]
        broadcast_id: String,
    },
    BroadcastJoined {
        #[serde(rename = "publisherConnectionId")]
        publisher_connection_id: String,
    },
    ViewerJoined {
        #[serde(rename = "viewerConnectionId")]
        viewer_connection_id: String,
    },
    BroadcastNotFound {
        #[serde(rename = "broadcastId")]
        broadcast_id: String,
    },
    ErrorMessage {
        message: String,
    },
}

impl ServerEvent {
    /// Shorthand for the common `error-message` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorMessage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_participants_serializes_as_bare_array_data() {
        let event = ServerEvent::RoomParticipants(vec![ParticipantInfo::new(
            "C1".to_string(),
            None,
            "alice".to_string(),
        )]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "room-participants");
        assert!(value["data"].is_array());
        assert_eq!(value["data"][0]["username"], "alice");
    }

    #[test]
    fn user_joined_omits_user_id_when_guest() {
        let event = ServerEvent::UserJoined {
            connection_id: "C2".to_string(),
            user_id: None,
            username: "Guest_abcdef".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["data"].get("userId").is_none());
    }

    #[test]
    fn error_message_helper_matches_event_shape() {
        let event = ServerEvent::error("Chat rate limit exceeded. Slow down.");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "error-message");
        assert_eq!(
            value["data"]["message"],
            "Chat rate limit exceeded. Slow down."
        );
    }
}
