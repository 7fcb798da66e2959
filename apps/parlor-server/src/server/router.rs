use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{
    core::{AppConfig, AppState},
    handlers::{
        auth::{login, me, register},
        direct_chats::{create_direct_chat, direct_chat_messages, list_direct_chats},
        rooms::{create_room, get_room, join_room, list_rooms, room_messages},
    },
    realtime::chat_ws,
    types::{health, metrics},
};

/// Build the axum router with global security middleware.
///
/// # Errors
/// Returns an error if configured limits are invalid.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    if config.max_frame_bytes > parlor_protocol::MAX_FRAME_BYTES {
        return Err(anyhow!(
            "frame limit cannot exceed protocol max of {} bytes",
            parlor_protocol::MAX_FRAME_BYTES
        ));
    }
    if config.rate_limit_requests_per_minute == 0 {
        return Err(anyhow!("rate limit must be at least 1 request per minute"));
    }
    if config.outbound_queue == 0 {
        return Err(anyhow!("outbound queue capacity must be at least 1 frame"));
    }
    if config.history_limit_max == 0 {
        return Err(anyhow!("history limit cap must be at least 1 message"));
    }
    if config.read_wait.is_zero() || config.write_wait.is_zero() {
        return Err(anyhow!("read and write deadlines must be non-zero"));
    }

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(60))
            .burst_size(config.rate_limit_requests_per_minute)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("invalid governor configuration"))?,
    );
    let state = AppState::new(config)?;
    let request_id_header = HeaderName::from_static("x-request-id");
    let governor_layer = GovernorLayer::new(governor_config);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/rooms", post(create_room).get(list_rooms))
        .route("/api/v1/rooms/{room_id}", get(get_room))
        .route("/api/v1/rooms/{room_id}/join", post(join_room))
        .route("/api/v1/rooms/{room_id}/messages", get(room_messages))
        .route(
            "/api/v1/direct-chats",
            post(create_direct_chat).get(list_direct_chats),
        )
        .route(
            "/api/v1/direct-chats/{chat_id}/messages",
            get(direct_chat_messages),
        )
        .route("/chat/ws", get(chat_ws))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
                .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout,
                ))
                .layer(governor_layer),
        ))
}
