pub mod login;
pub mod register;

use axum::Router;

use crate::app::AppState;

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .merge(login::auth_router(state.clone()))
        .merge(register::auth_router(state))
}
