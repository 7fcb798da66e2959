pub(crate) mod auth;
pub(crate) mod chat_repository;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod errors;
pub(crate) mod events;
pub(crate) mod handlers;
pub(crate) mod membership;
pub(crate) mod metrics;
pub(crate) mod realtime;
pub(crate) mod router;
pub(crate) mod types;

pub use self::core::AppConfig;
pub use self::errors::init_tracing;
pub use self::router::build_router;
