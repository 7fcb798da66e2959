use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
};

use crate::server::{
    auth::{authenticate, find_username_by_subject},
    chat_repository::{ChatPersistence, ChatRepository},
    core::AppState,
    errors::ApiFailure,
    handlers::rooms::effective_history_limit,
    types::{
        ChatPath, CreateDirectChatRequest, DirectChatResponse, HistoryQuery, MessagesResponse,
    },
};

pub(crate) async fn create_direct_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateDirectChatRequest>,
) -> Result<Json<DirectChatResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let user_id = auth.user_id.to_string();
    if payload.other_user_id == user_id {
        return Err(ApiFailure::InvalidRequest);
    }
    if find_username_by_subject(&state, &payload.other_user_id)
        .await
        .is_none()
    {
        return Err(ApiFailure::NotFound);
    }

    let repo = ChatRepository::from_state(&state).await?;
    let chat = repo
        .find_or_create_direct_chat(&user_id, &payload.other_user_id)
        .await?;
    Ok(Json(DirectChatResponse::from(chat)))
}

pub(crate) async fn list_direct_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DirectChatResponse>>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let repo = ChatRepository::from_state(&state).await?;
    let chats = repo.user_direct_chats(&auth.user_id.to_string()).await?;
    Ok(Json(
        chats.into_iter().map(DirectChatResponse::from).collect(),
    ))
}

pub(crate) async fn direct_chat_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<ChatPath>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagesResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    let user_id = auth.user_id.to_string();
    let repo = ChatRepository::from_state(&state).await?;
    let chat = repo
        .get_direct_chat(&path.chat_id)
        .await?
        .ok_or(ApiFailure::NotFound)?;
    if !chat.user_ids.iter().any(|id| id == &user_id) {
        return Err(ApiFailure::Forbidden);
    }

    let limit = effective_history_limit(query.limit, state.runtime.history_limit_max);
    let messages = repo.direct_chat_messages(&path.chat_id, limit).await?;
    Ok(Json(MessagesResponse { messages }))
}
