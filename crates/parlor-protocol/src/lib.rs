#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum allowed frame bytes read from a peer.
pub const MAX_FRAME_BYTES: usize = 10_000;

/// Closed set of envelope kinds exchanged between a connection and the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    ChatRoom,
    DirectChat,
    JoinRoom,
    JoinDirectChat,
    UserLeave,
    Error,
    RoomCreated,
}

impl MessageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatRoom => "CHAT_ROOM",
            Self::DirectChat => "DIRECT_CHAT",
            Self::JoinRoom => "JOIN_ROOM",
            Self::JoinDirectChat => "JOIN_DIRECT_CHAT",
            Self::UserLeave => "USER_LEAVE",
            Self::Error => "ERROR",
            Self::RoomCreated => "ROOM_CREATED",
        }
    }
}

/// Tagged wire message. All frames use `{ type, payload, timestamp }`; the
/// payload is kind-dependent and decoded lazily by the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Chat message payload for `CHAT_ROOM` and `DIRECT_CHAT` envelopes.
///
/// `room_id` doubles as the direct-chat id for direct messages. `id` and
/// `created_at` may be absent on inbound frames; the server assigns them at
/// persist time and always overwrites `user_id` with the authenticated
/// sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Parse and validate an incoming frame at the network boundary.
///
/// # Errors
/// Returns [`ProtocolError`] if the frame exceeds [`MAX_FRAME_BYTES`], is
/// malformed JSON, or carries a kind outside the closed enumeration.
pub fn parse_frame(input: &[u8]) -> Result<Envelope, ProtocolError> {
    if input.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::OversizedFrame {
            max: MAX_FRAME_BYTES,
            actual: input.len(),
        });
    }

    Ok(serde_json::from_slice(input)?)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame exceeds max size: max={max} bytes actual={actual} bytes")]
    OversizedFrame { max: usize, actual: usize },
    #[error("invalid json frame")]
    InvalidJson,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(_: serde_json::Error) -> Self {
        Self::InvalidJson
    }
}
