use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use ulid::Ulid;

use parlor_core::RoomName;

use crate::server::{
    auth::authenticate,
    chat_repository::{ChatPersistence, ChatRepository},
    core::{AppState, RoomRecord, DEFAULT_HISTORY_LIMIT},
    errors::ApiFailure,
    membership::room_access,
    types::{CreateRoomRequest, HistoryQuery, MessagesResponse, RoomPath, RoomResponse},
};

/// Builds the record for a new room. The creator is always the owner and
/// starts out as both a member and an admin.
fn new_room_record(request: CreateRoomRequest, owner_id: &str, now: DateTime<Utc>) -> RoomRecord {
    RoomRecord {
        id: Ulid::new().to_string(),
        name: request.name,
        description: request.description,
        owner_id: owner_id.to_owned(),
        is_private: request.is_private,
        members: vec![owner_id.to_owned()],
        admins: vec![owner_id.to_owned()],
        last_message: None,
        image_url: request.image_url,
        created_at: now,
        updated_at: now,
        is_deleted: false,
    }
}

pub(crate) fn effective_history_limit(requested: Option<usize>, cap: usize) -> usize {
    requested.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, cap)
}

pub(crate) async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    RoomName::try_from(payload.name.clone()).map_err(|_| ApiFailure::InvalidRequest)?;

    let record = new_room_record(payload, &auth.user_id.to_string(), Utc::now());
    let repo = ChatRepository::from_state(&state).await?;
    repo.create_room(&record).await?;

    tracing::info!(room_id = %record.id, owner_id = %record.owner_id, "room created");
    Ok((StatusCode::CREATED, Json(RoomResponse::from(record))))
}

pub(crate) async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomResponse>>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let repo = ChatRepository::from_state(&state).await?;
    let rooms = repo.user_rooms(&auth.user_id.to_string()).await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

pub(crate) async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<Json<RoomResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let repo = ChatRepository::from_state(&state).await?;
    let room = repo
        .get_room(&path.room_id)
        .await?
        .ok_or(ApiFailure::NotFound)?;
    if !room_access(&room, &auth.user_id.to_string()).can_read {
        return Err(ApiFailure::Forbidden);
    }
    Ok(Json(RoomResponse::from(room)))
}

pub(crate) async fn join_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<StatusCode, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let user_id = auth.user_id.to_string();
    let repo = ChatRepository::from_state(&state).await?;
    let room = repo
        .get_room(&path.room_id)
        .await?
        .ok_or(ApiFailure::NotFound)?;
    // membership joins a private room only by invitation elsewhere
    if room.is_private && !room_access(&room, &user_id).can_write {
        return Err(ApiFailure::Forbidden);
    }
    repo.add_member_to_room(&path.room_id, &user_id).await?;

    tracing::info!(room_id = %path.room_id, user_id = %user_id, "user added to room");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn room_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagesResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let repo = ChatRepository::from_state(&state).await?;
    let room = repo
        .get_room(&path.room_id)
        .await?
        .ok_or(ApiFailure::NotFound)?;
    if !room_access(&room, &auth.user_id.to_string()).can_read {
        return Err(ApiFailure::Forbidden);
    }

    let limit = effective_history_limit(query.limit, state.runtime.history_limit_max);
    let messages = repo.room_messages(&path.room_id, limit).await?;
    Ok(Json(MessagesResponse { messages }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{effective_history_limit, new_room_record};
    use crate::server::types::CreateRoomRequest;

    #[test]
    fn new_room_makes_creator_owner_member_and_admin() {
        let record = new_room_record(
            CreateRoomRequest {
                name: String::from("General"),
                description: String::from("everything"),
                is_private: true,
                image_url: String::new(),
            },
            "u1",
            Utc::now(),
        );

        assert!(!record.id.is_empty());
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.members, vec!["u1"]);
        assert_eq!(record.admins, vec!["u1"]);
        assert!(record.is_private);
        assert!(!record.is_deleted);
    }

    #[test]
    fn history_limit_defaults_and_caps() {
        assert_eq!(effective_history_limit(None, 100), 50);
        assert_eq!(effective_history_limit(Some(10), 100), 10);
        assert_eq!(effective_history_limit(Some(500), 100), 100);
        assert_eq!(effective_history_limit(Some(0), 100), 1);
    }
}
