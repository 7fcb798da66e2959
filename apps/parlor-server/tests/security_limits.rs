use std::time::Duration;

use axum::{body::Body, http::Request, http::StatusCode};
use parlor_server::{build_router, AppConfig};
use tower::ServiceExt;

#[tokio::test]
async fn rejects_body_over_limit() {
    let config = AppConfig {
        max_body_bytes: 32,
        request_timeout: Duration::from_secs(1),
        rate_limit_requests_per_minute: 60,
        ..AppConfig::default()
    };
    let app = build_router(&config).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(
            r#"{"username":"body_limit_user","password":"super-secure-password"}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn rate_limits_per_client_ip() {
    let config = AppConfig {
        max_body_bytes: 1024,
        request_timeout: Duration::from_secs(1),
        rate_limit_requests_per_minute: 2,
        ..AppConfig::default()
    };
    let app = build_router(&config).unwrap();

    let request = |ip: &str| {
        Request::builder()
            .method("GET")
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let second = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let third = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let other_ip = app.oneshot(request("198.51.100.10")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other_ip.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejects_invalid_configuration() {
    let zero_queue = AppConfig {
        outbound_queue: 0,
        ..AppConfig::default()
    };
    assert!(build_router(&zero_queue).is_err());

    let oversized_frames = AppConfig {
        max_frame_bytes: parlor_protocol::MAX_FRAME_BYTES + 1,
        ..AppConfig::default()
    };
    assert!(build_router(&oversized_frames).is_err());

    let zero_history = AppConfig {
        history_limit_max: 0,
        ..AppConfig::default()
    };
    assert!(build_router(&zero_history).is_err());
}
