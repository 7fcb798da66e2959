use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_protocol::ChatMessage;

use super::{
    core::{DirectChatRecord, RoomRecord},
    metrics::render_metrics,
};

const METRICS_TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Serialize)]
pub(crate) struct ApiError {
    pub(crate) error: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn metrics() -> Response {
    (
        [(CONTENT_TYPE, METRICS_TEXT_CONTENT_TYPE)],
        render_metrics(),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuthRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    pub(crate) access_token: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserResponse {
    pub(crate) user_id: String,
    pub(crate) username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatSocketQuery {
    pub(crate) token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRoomRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) is_private: bool,
    #[serde(default)]
    pub(crate) image_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) owner_id: String,
    pub(crate) is_private: bool,
    pub(crate) members: Vec<String>,
    pub(crate) admins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_message: Option<ChatMessage>,
    pub(crate) image_url: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_deleted: bool,
}

impl From<RoomRecord> for RoomResponse {
    fn from(record: RoomRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            owner_id: record.owner_id,
            is_private: record.is_private,
            members: record.members,
            admins: record.admins,
            last_message: record.last_message,
            image_url: record.image_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_deleted: record.is_deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDirectChatRequest {
    pub(crate) other_user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DirectChatResponse {
    pub(crate) id: String,
    pub(crate) user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_message: Option<ChatMessage>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_deleted: bool,
}

impl From<DirectChatRecord> for DirectChatResponse {
    fn from(record: DirectChatRecord) -> Self {
        Self {
            id: record.id,
            user_ids: record.user_ids,
            last_message: record.last_message,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_deleted: record.is_deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomPath {
    pub(crate) room_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatPath {
    pub(crate) chat_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MessagesResponse {
    pub(crate) messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{RoomRecord, RoomResponse};

    #[test]
    fn room_response_serializes_camel_case() {
        let now = Utc::now();
        let response = RoomResponse::from(RoomRecord {
            id: String::from("r1"),
            name: String::from("General"),
            description: String::new(),
            owner_id: String::from("u1"),
            is_private: false,
            members: vec![String::from("u1")],
            admins: vec![String::from("u1")],
            last_message: None,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        });

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["ownerId"], "u1");
        assert_eq!(value["isPrivate"], false);
        assert_eq!(value["imageUrl"], "");
        assert!(value.get("lastMessage").is_none());
    }
}
