use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use tower_sessions::Session;

use crate::app::AppState;
use crate::data::models::{ApiError, CreateDeckRequest, DeckCreated};
use crate::data::repositories::SqliteStore;
use crate::engine::{catalog, indexer, Deck, DeckId, EngineError, Store};
use crate::parser::Language;
use crate::utils::require_user;

pub async fn list_decks(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Deck>>, ApiError> {
    let user = require_user(&session).await?;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    Ok(Json(indexer::list_decks(&mut store, user)?))
}

/// Parses the text, stores it as a deck and creates cards for its lemmas.
pub async fn create_deck(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CreateDeckRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DeckCreated>), ApiError> {
    let user = require_user(&session).await?;
    let Json(request) = payload?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Deck title must not be empty".to_string()));
    }
    let lang: Language = request.lang.parse().map_err(EngineError::from)?;
    let sentences = state
        .parser
        .analyze(lang, &request.text)
        .map_err(EngineError::from)?;
    if sentences.is_empty() {
        return Err(ApiError::BadRequest("Text contains no words".to_string()));
    }

    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    let now = Utc::now();
    let created = store.atomically(|store| {
        let deck_id = indexer::create_deck(store, user, title, lang.code(), now)?;
        let index = indexer::index_deck(store, deck_id, &sentences)?;
        let occurrences = store.deck_occurrences(deck_id)?;
        let cards = catalog::ensure_cards(store, user, &occurrences, now)?;
        Ok(DeckCreated { deck_id, index, cards })
    })?;

    log::info!(
        "user {} imported deck {} ({} sentences, {} new cards)",
        user,
        created.deck_id,
        created.index.sentences_indexed,
        created.cards.created
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_deck(
    State(state): State<AppState>,
    session: Session,
    Path(deck_id): Path<DeckId>,
) -> Result<StatusCode, ApiError> {
    let user = require_user(&session).await?;
    let _guard = state.locks.acquire(user).await;
    let mut conn = state.pool.get()?;
    let mut store = SqliteStore::new(&mut conn);
    indexer::delete_deck(&mut store, user, deck_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn deck_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_decks).post(create_deck))
        .route("/{id}", delete(delete_deck))
        .with_state(state)
}
