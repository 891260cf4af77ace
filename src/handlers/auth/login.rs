use axum::{
    extract::{Json, State},
    response::Redirect,
    routing::{get, post},
    Router,
};

use crate::{
    app::AppState,
    utils::{clear_user_session, set_user_session},
    data::repositories::UserRepository
};
use crate::data::models::{LoginError, LoginForm, SessionUser};

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<SessionUser>, LoginError> {
    let mut conn = state.pool.get()
        .map_err(|e| {
            log::error!("Failed to get DB connection: {}", e);
            LoginError::from(e)
        })?;
    
    let user = UserRepository::find_by_email(&mut conn, &form.email)
        .map_err(|e| {
            log::error!("Database error during login: {}", e);
            LoginError::DatabaseError(e)
        })?;

    match user {
        Some(user) => {
            let is_valid = UserRepository::verify_password(&user.password, &form.password)
                .map_err(|e| {
                    log::error!("Password verification failed: {}", e);
                    LoginError::HashingError(e)
                })?;
            
            if is_valid {
                set_user_session(&session, user.user_id, &user.email).await?;
                log::info!("User {} logged in", user.user_id);
                Ok(Json(SessionUser { user_id: user.user_id, email: user.email }))
            } else {
                log::warn!("Invalid password for user: {}", form.email);
                Err(LoginError::InvalidCredentials)
            }
        },
        None => {
            log::warn!("User not found: {}", form.email);
            Err(LoginError::InvalidCredentials)
        }
    }
}

pub async fn handle_logout(
    session: tower_sessions::Session
) -> Result<Redirect, LoginError> {
    clear_user_session(&session).await.map_err(|e| {
        log::error!("Failed to delete session: {}", e);
        LoginError::SessionError("Failed to logout".into())
    })?;
    Ok(Redirect::to("/"))
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(handle_login))
        .route("/logout", get(handle_logout))
        .with_state(state)
}
