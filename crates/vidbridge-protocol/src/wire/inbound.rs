//! Client → broker events

use super::envelope::SignalingPayload;
use serde::Deserialize;

/// Every event shape a browser client may send on the message channel.
///
/// Malformed frames (unknown `type`, missing/mistyped fields) fail to
/// deserialize at this single edge, so every handler downstream of
/// dispatch is total over a known, validated shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    LeaveRoom,
    Offer {
        to: String,
        offer: SignalingPayload,
    },
    Answer {
        to: String,
        answer: SignalingPayload,
    },
    IceCandidate {
        to: String,
        candidate: SignalingPayload,
    },
    ChatMessage {
        #[serde(rename = "roomId")]
        room_id: String,
        message: String,
    },
    ChatReaction {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        emoji: String,
    },
    ToggleMute {
        #[serde(rename = "roomId")]
        room_id: String,
        muted: bool,
    },
    ToggleVideo {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "videoOff")]
        video_off: bool,
    },
    ScreenShareStart {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    ScreenShareStop {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    HandRaise {
        #[serde(rename = "roomId")]
        room_id: String,
        raised: bool,
    },
    ApproveUser {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
    RejectUser {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
    CreateBroadcast {
        #[serde(rename = "broadcastId")]
        broadcast_id: String,
    },
    JoinBroadcast {
        #[serde(rename = "broadcastId")]
        broadcast_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_parses() {
        let frame = r#"{"type":"join-room","data":{"roomId":"ABCD1234"}}"#;
        let ev: ClientEvent = serde_json::from_str(frame).unwrap();
        match ev {
            ClientEvent::JoinRoom { room_id } => assert_eq!(room_id, "ABCD1234"),
            _ => panic!("expected JoinRoom"),
        }
    }

    #[test]
    fn leave_room_parses_with_no_data() {
        let frame = r#"{"type":"leave-room"}"#;
        let ev: ClientEvent = serde_json::from_str(frame).unwrap();
        assert!(matches!(ev, ClientEvent::LeaveRoom));
    }

    #[test]
    fn offer_carries_opaque_payload() {
        let frame = r#"{"type":"offer","data":{"to":"C1","offer":{"sdp":"v=0","type":"offer"}}}"#;
        let ev: ClientEvent = serde_json::from_str(frame).unwrap();
        match ev {
            ClientEvent::Offer { to, offer } => {
                assert_eq!(to, "C1");
                assert_eq!(offer.as_value()["type"], "offer");
            }
            _ => panic!("expected Offer"),
        }
    }

    #[test]
    fn unknown_event_fails_to_parse() {
        let frame = r#"{"type":"definitely-not-real","data":{}}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(frame);
        assert!(result.is_err());
    }

    #[test]
    fn chat_reaction_parses() {
        let frame =
            r#"{"type":"chat-reaction","data":{"roomId":"R","messageId":"m1","emoji":"👍"}}"#;
        let ev: ClientEvent = serde_json::from_str(frame).unwrap();
        match ev {
            ClientEvent::ChatReaction {
                room_id,
                message_id,
                emoji,
            } => {
                assert_eq!(room_id, "R");
                assert_eq!(message_id, "m1");
                assert_eq!(emoji, "👍");
            }
            _ => panic!("expected ChatReaction"),
        }
    }
}
