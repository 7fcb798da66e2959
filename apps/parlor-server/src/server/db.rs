use super::{core::AppState, errors::ApiFailure};

const CREATE_USERS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL
                )";
const CREATE_ROOMS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS rooms (
                    room_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    owner_id TEXT NOT NULL,
                    is_private BOOLEAN NOT NULL DEFAULT FALSE,
                    members TEXT[] NOT NULL DEFAULT '{}',
                    admins TEXT[] NOT NULL DEFAULT '{}',
                    last_message TEXT NULL,
                    image_url TEXT NOT NULL DEFAULT '',
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL,
                    is_deleted BOOLEAN NOT NULL DEFAULT FALSE
                )";
const CREATE_DIRECT_CHATS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS direct_chats (
                    chat_id TEXT PRIMARY KEY,
                    user_ids TEXT[] NOT NULL,
                    last_message TEXT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL,
                    is_deleted BOOLEAN NOT NULL DEFAULT FALSE
                )";
const CREATE_MESSAGES_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS messages (
                    message_id TEXT PRIMARY KEY,
                    channel_kind TEXT NOT NULL,
                    channel_id TEXT NOT NULL,
                    author_id TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL,
                    is_deleted BOOLEAN NOT NULL DEFAULT FALSE
                )";
const CREATE_MESSAGES_CHANNEL_CREATED_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_messages_channel_created
                    ON messages(channel_kind, channel_id, created_at DESC)";

pub(crate) async fn ensure_db_schema(state: &AppState) -> Result<(), ApiFailure> {
    const SCHEMA_INIT_LOCK_ID: i64 = 0x5041_524c_4f52_4442;
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };

    state
        .db_init
        .get_or_try_init(|| async move {
            let mut tx = pool.begin().await?;
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(SCHEMA_INIT_LOCK_ID)
                .execute(&mut *tx)
                .await?;

            for statement in [
                CREATE_USERS_TABLE_SQL,
                CREATE_ROOMS_TABLE_SQL,
                CREATE_DIRECT_CHATS_TABLE_SQL,
                CREATE_MESSAGES_TABLE_SQL,
                CREATE_MESSAGES_CHANNEL_CREATED_INDEX_SQL,
            ] {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            tx.commit().await?;
            Ok::<(), sqlx::Error>(())
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database schema init failed");
            ApiFailure::Internal
        })?;

    Ok(())
}
