use chrono::Utc;
use serde::Serialize;

use parlor_protocol::{ChatMessage, Envelope, MessageKind};

/// A serialized outbound envelope, tagged with its kind for logging and
/// metrics labels.
pub(crate) struct WireFrame {
    pub(crate) kind: MessageKind,
    pub(crate) frame: String,
}

fn build_frame<T: Serialize>(kind: MessageKind, payload: T) -> WireFrame {
    let envelope = Envelope {
        kind,
        payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        timestamp: Some(Utc::now()),
    };
    WireFrame {
        kind,
        frame: serde_json::to_string(&envelope)
            .unwrap_or_else(|_| String::from(r#"{"type":"ERROR","payload":"serialize_error"}"#)),
    }
}

pub(crate) fn chat_room(message: &ChatMessage) -> WireFrame {
    build_frame(MessageKind::ChatRoom, message)
}

pub(crate) fn direct_chat(message: &ChatMessage) -> WireFrame {
    build_frame(MessageKind::DirectChat, message)
}

pub(crate) fn error(reason: &str) -> WireFrame {
    build_frame(MessageKind::Error, reason)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Value;

    use parlor_protocol::{ChatMessage, MessageKind};

    use super::{chat_room, error};

    #[test]
    fn chat_room_frame_carries_message_payload_and_timestamp() {
        let now = Utc::now();
        let message = ChatMessage {
            id: String::from("m1"),
            content: String::from("hello"),
            user_id: String::from("u1"),
            room_id: String::from("r1"),
            created_at: Some(now),
            updated_at: Some(now),
            is_deleted: false,
        };

        let frame = chat_room(&message);
        assert_eq!(frame.kind, MessageKind::ChatRoom);

        let value: Value = serde_json::from_str(&frame.frame).unwrap();
        assert_eq!(value["type"], "CHAT_ROOM");
        assert_eq!(value["payload"]["id"], "m1");
        assert_eq!(value["payload"]["userId"], "u1");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn error_frame_carries_bare_string_payload() {
        let frame = error("No permission to join this room");
        assert_eq!(frame.kind, MessageKind::Error);

        let value: Value = serde_json::from_str(&frame.frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"], "No permission to join this room");
    }
}
