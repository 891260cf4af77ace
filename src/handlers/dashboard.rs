use axum::{
    extract::{rejection::JsonRejection, Json, State},
    routing::get,
    Router,
};
use chrono::Utc;
use tower_sessions::Session;

use crate::app::AppState;
use crate::data::models::ApiError;
use crate::data::repositories::SqliteStore;
use crate::engine::stats::{self, Dashboard};
use crate::engine::{Store, UserSettings};
use crate::utils::require_user;

pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Dashboard>, ApiError> {
    let user = require_user(&session).await?;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    Ok(Json(stats::dashboard(&mut store, user, Utc::now())?))
}

pub async fn get_settings(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<UserSettings>, ApiError> {
    let user = require_user(&session).await?;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    Ok(Json(store.user_settings(user)?))
}

/// Stores the settings after clamping them into their allowed ranges and
/// returns what was stored.
pub async fn put_settings(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<UserSettings>, JsonRejection>,
) -> Result<Json<UserSettings>, ApiError> {
    let user = require_user(&session).await?;
    let Json(settings) = payload?;
    let settings = settings.sanitized();

    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    store.atomically(|store| store.save_user_settings(user, &settings))?;
    log::debug!("user {} updated settings: {:?}", user, settings);
    Ok(Json(settings))
}

pub fn dashboard_router(state: AppState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/settings", get(get_settings).put(put_settings))
        .with_state(state)
}
