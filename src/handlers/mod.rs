pub mod auth;
pub mod dashboard;
pub mod deck;
pub mod knowledge;
pub mod review;

use axum::Router;

use crate::app::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/decks", deck::deck_router(state.clone()))
        .merge(review::review_router(state.clone()))
        .merge(knowledge::knowledge_router(state.clone()))
        .merge(dashboard::dashboard_router(state))
}
