use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use pasetors::{keys::SymmetricKey, version4::V4};
use rand::{rngs::OsRng, RngCore};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::{OnceCell, RwLock};

use parlor_core::{UserId, Username};
use parlor_protocol::ChatMessage;

use super::{auth::hash_password, realtime::hub::HubHandle};

pub const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 1_048_576;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE: u32 = 60;
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;
pub const DEFAULT_MAX_FRAME_BYTES: usize = parlor_protocol::MAX_FRAME_BYTES;
pub const DEFAULT_READ_WAIT_SECS: u64 = 60;
pub const DEFAULT_WRITE_WAIT_SECS: u64 = 10;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 100;
pub(crate) const HUB_COMMAND_QUEUE: usize = 64;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub rate_limit_requests_per_minute: u32,
    pub outbound_queue: usize,
    pub max_frame_bytes: usize,
    pub read_wait: Duration,
    pub write_wait: Duration,
    pub history_limit_max: usize,
    pub database_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            rate_limit_requests_per_minute: DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            read_wait: Duration::from_secs(DEFAULT_READ_WAIT_SECS),
            write_wait: Duration::from_secs(DEFAULT_WRITE_WAIT_SECS),
            history_limit_max: MAX_HISTORY_LIMIT,
            database_url: None,
        }
    }
}

/// Ping cadence derived from the read deadline; probes must arrive well
/// before the deadline they refresh.
pub(crate) fn ping_period(read_wait: Duration) -> Duration {
    (read_wait * 9) / 10
}

#[derive(Clone)]
pub(crate) struct RuntimeConfig {
    pub(crate) outbound_queue: usize,
    pub(crate) max_frame_bytes: usize,
    pub(crate) read_wait: Duration,
    pub(crate) write_wait: Duration,
    pub(crate) history_limit_max: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) db_pool: Option<PgPool>,
    pub(crate) db_init: Arc<OnceCell<()>>,
    pub(crate) users: Arc<RwLock<HashMap<String, UserRecord>>>,
    pub(crate) user_ids: Arc<RwLock<HashMap<String, String>>>,
    pub(crate) rooms: Arc<RwLock<HashMap<String, RoomRecord>>>,
    pub(crate) room_messages: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
    pub(crate) direct_chats: Arc<RwLock<HashMap<String, DirectChatRecord>>>,
    pub(crate) direct_messages: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
    pub(crate) token_key: Arc<SymmetricKey<V4>>,
    pub(crate) dummy_password_hash: Arc<String>,
    pub(crate) hub: HubHandle,
    pub(crate) runtime: Arc<RuntimeConfig>,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let mut key_bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut key_bytes);
        let token_key = SymmetricKey::<V4>::from(&key_bytes)
            .map_err(|e| anyhow!("token key init failed: {e}"))?;
        let dummy_password_hash = hash_password("parlor-dummy-password")?;
        let db_pool = if let Some(database_url) = &config.database_url {
            Some(
                PgPoolOptions::new()
                    .max_connections(10)
                    .connect_lazy(database_url)
                    .map_err(|e| anyhow!("postgres pool init failed: {e}"))?,
            )
        } else {
            None
        };

        Ok(Self {
            db_pool,
            db_init: Arc::new(OnceCell::new()),
            users: Arc::new(RwLock::new(HashMap::new())),
            user_ids: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            room_messages: Arc::new(RwLock::new(HashMap::new())),
            direct_chats: Arc::new(RwLock::new(HashMap::new())),
            direct_messages: Arc::new(RwLock::new(HashMap::new())),
            token_key: Arc::new(token_key),
            dummy_password_hash: Arc::new(dummy_password_hash),
            hub: HubHandle::spawn(HUB_COMMAND_QUEUE),
            runtime: Arc::new(RuntimeConfig {
                outbound_queue: config.outbound_queue,
                max_frame_bytes: config.max_frame_bytes,
                read_wait: config.read_wait,
                write_wait: config.write_wait,
                history_limit_max: config.history_limit_max,
            }),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: UserId,
    pub(crate) username: Username,
    pub(crate) password_hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct RoomRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) owner_id: String,
    pub(crate) is_private: bool,
    pub(crate) members: Vec<String>,
    pub(crate) admins: Vec<String>,
    pub(crate) last_message: Option<ChatMessage>,
    pub(crate) image_url: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_deleted: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct DirectChatRecord {
    pub(crate) id: String,
    pub(crate) user_ids: Vec<String>,
    pub(crate) last_message: Option<ChatMessage>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_deleted: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AuthContext {
    pub(crate) user_id: UserId,
    pub(crate) username: String,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ping_period;

    #[test]
    fn ping_period_is_nine_tenths_of_read_wait() {
        assert_eq!(
            ping_period(Duration::from_secs(60)),
            Duration::from_secs(54)
        );
    }
}
