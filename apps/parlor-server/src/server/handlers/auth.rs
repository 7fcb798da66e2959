use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
};
use sqlx::Row;

use parlor_core::{UserId, Username};

use crate::server::{
    auth::{authenticate, hash_password, issue_access_token, verify_password},
    core::{AppState, UserRecord},
    db::ensure_db_schema,
    errors::ApiFailure,
    types::{AuthRequest, AuthResponse, UserResponse},
};

fn validate_password(password: &str) -> Result<(), ApiFailure> {
    if (8..=128).contains(&password.len()) {
        Ok(())
    } else {
        Err(ApiFailure::InvalidRequest)
    }
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiFailure> {
    let username = Username::try_from(payload.username).map_err(|_| ApiFailure::InvalidRequest)?;
    validate_password(&payload.password)?;
    let password_hash = hash_password(&payload.password).map_err(|_| ApiFailure::Internal)?;
    let user_id = UserId::new();

    if let Some(pool) = &state.db_pool {
        ensure_db_schema(&state).await?;
        let result = sqlx::query(
            "INSERT INTO users (user_id, username, password_hash)
             VALUES ($1, $2, $3)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(user_id.to_string())
        .bind(username.as_str())
        .bind(&password_hash)
        .execute(pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        if result.rows_affected() == 0 {
            return Err(ApiFailure::InvalidRequest);
        }
    } else {
        let mut users = state.users.write().await;
        if users.contains_key(username.as_str()) {
            return Err(ApiFailure::InvalidRequest);
        }
        users.insert(
            username.as_str().to_owned(),
            UserRecord {
                id: user_id,
                username: username.clone(),
                password_hash,
            },
        );
        state
            .user_ids
            .write()
            .await
            .insert(user_id.to_string(), username.as_str().to_owned());
    }

    tracing::info!(user_id = %user_id, username = username.as_str(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user_id: user_id.to_string(),
            username: username.as_str().to_owned(),
        }),
    ))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiFailure> {
    let username = Username::try_from(payload.username).map_err(|_| ApiFailure::Unauthorized)?;

    let verified: Option<UserId> = if let Some(pool) = &state.db_pool {
        ensure_db_schema(&state).await?;
        let row = sqlx::query("SELECT user_id, password_hash FROM users WHERE username = $1")
            .bind(username.as_str())
            .fetch_optional(pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        match row {
            Some(row) => {
                let user_id: String = row.try_get("user_id").map_err(|_| ApiFailure::Internal)?;
                let password_hash: String = row
                    .try_get("password_hash")
                    .map_err(|_| ApiFailure::Internal)?;
                if verify_password(&password_hash, &payload.password) {
                    UserId::try_from(user_id).ok()
                } else {
                    None
                }
            }
            None => {
                // burn comparable time for unknown usernames
                let _ = verify_password(&state.dummy_password_hash, &payload.password);
                None
            }
        }
    } else {
        let users = state.users.read().await;
        match users.get(username.as_str()) {
            Some(record) => {
                verify_password(&record.password_hash, &payload.password).then_some(record.id)
            }
            None => {
                let _ = verify_password(&state.dummy_password_hash, &payload.password);
                None
            }
        }
    };

    let user_id = verified.ok_or(ApiFailure::Unauthorized)?;
    let access_token =
        issue_access_token(&state, user_id, username.as_str()).map_err(|_| ApiFailure::Internal)?;
    Ok(Json(AuthResponse {
        access_token,
        user_id: user_id.to_string(),
        username: username.as_str().to_owned(),
    }))
}

pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers).await?;
    Ok(Json(UserResponse {
        user_id: auth.user_id.to_string(),
        username: auth.username,
    }))
}
