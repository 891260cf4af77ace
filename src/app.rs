use std::sync::Arc;

use axum::Router;
use time::Duration;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::AppConfig;
use crate::data::DbPool;
use crate::engine::{SchedulerParams, UserLocks};
use crate::handlers;
use crate::parser::Parser;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub locks: UserLocks,
    pub scheduler: Arc<SchedulerParams>,
    pub parser: Arc<dyn Parser>,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(pool: DbPool, parser: Arc<dyn Parser>, config: &AppConfig) -> Self {
        Self {
            pool,
            locks: UserLocks::new(),
            scheduler: Arc::new(SchedulerParams::default().with_maximum_interval(config.max_interval_days)),
            parser,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    // Sessions configuration
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(config.session_days)))
        .with_secure(false);

    Router::new()
        .nest("/auth", handlers::auth::auth_router(state.clone()))
        .nest("/api", handlers::api_router(state))
        .fallback_service(ServeDir::new(&config.web_dir))
        .layer(session_layer)
}
