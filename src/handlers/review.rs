use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tower_sessions::Session;

use crate::app::AppState;
use crate::data::models::{AnswerRequest, ApiError, CardRequest};
use crate::data::repositories::SqliteStore;
use crate::engine::review::{self, ReviewOutcome};
use crate::engine::{selector, Card, Grade};
use crate::utils::require_user;

/// Next card to study, or 204 when nothing is due and no new card is allowed.
pub async fn next_card(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, ApiError> {
    let user = require_user(&session).await?;
    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    match selector::next(&mut store, user, Utc::now())? {
        Some(presentation) => Ok(Json(presentation).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn answer(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;
    let grade = Grade::try_from(request.grade)?;

    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    let outcome = review::submit_answer(&mut store, user, request.card_id, grade, Utc::now(), &state.scheduler)?;
    Ok(Json(outcome))
}

pub async fn mark_known(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CardRequest>, JsonRejection>,
) -> Result<Json<Card>, ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;
    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    Ok(Json(review::mark_known(&mut store, user, request.card_id, Utc::now())?))
}

pub async fn mark_ignored(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CardRequest>, JsonRejection>,
) -> Result<Json<Card>, ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;
    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    Ok(Json(review::mark_ignored(&mut store, user, request.card_id, Utc::now())?))
}

pub fn review_router(state: AppState) -> Router {
    Router::new()
        .route("/review/next", get(next_card))
        .route("/review/answer", post(answer))
        .route("/card/known", post(mark_known))
        .route("/card/ignore", post(mark_ignored))
        .with_state(state)
}
