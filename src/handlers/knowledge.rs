use axum::{
    extract::{rejection::JsonRejection, Json, State},
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;

use crate::app::AppState;
use crate::data::models::{ApiError, ImportKnownRequest, LemmaRequest};
use crate::data::repositories::SqliteStore;
use crate::engine::knowledge;
use crate::utils::require_user;

#[derive(Serialize)]
pub struct Affected {
    pub count: usize,
}

/// Clears a known/ignored mark and brings the lemma's cards back.
pub async fn unmark(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<LemmaRequest>, JsonRejection>,
) -> Result<Json<Affected>, ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;
    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    let count = knowledge::unmark(&mut store, user, &request.lemma, &request.pos)?;
    Ok(Json(Affected { count }))
}

pub async fn import_known(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<ImportKnownRequest>, JsonRejection>,
) -> Result<Json<Affected>, ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;
    let lemmas: Vec<(String, String)> = request
        .lemmas
        .into_iter()
        .filter(|l| !l.lemma.trim().is_empty())
        .map(|l| (l.lemma, l.pos))
        .collect();

    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    let count = knowledge::import_known(&mut store, user, &lemmas, Utc::now())?;
    Ok(Json(Affected { count }))
}

pub fn knowledge_router(state: AppState) -> Router {
    Router::new()
        .route("/lemmas/unmark", post(unmark))
        .route("/lemmas/known", post(import_known))
        .with_state(state)
}
