use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use validator::Validate;

use crate::{
    app::AppState,
    utils::set_user_session,
    data::repositories::UserRepository,
    data::models::{RegisterError, RegisterForm, SessionUser}
};

#[axum::debug_handler]
pub async fn handle_register(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<SessionUser>), RegisterError> {
    form.validate().map_err(RegisterError::from)?;

    let mut conn = state.pool.get()
        .map_err(|e| {
            log::error!("Failed to get DB connection: {}", e);
            RegisterError::from(e)
        })?;

    if UserRepository::email_exists(&mut conn, &form.email)? {
        log::warn!("Registration attempt with existing email: {}", form.email);
        return Err(RegisterError::EmailTaken);
    }

    let user = UserRepository::create_user(&mut conn, &form.email, &form.password, state.bcrypt_cost)
        .map_err(|e| {
            log::error!("User creation failed: {}", e);
            e
        })?;

    set_user_session(&session, user.user_id, &user.email)
        .await
        .map_err(|e| {
            log::error!("Failed to set session: {:?}", e);
            RegisterError::SessionError("Failed to set user session".into())
        })?;

    log::info!("New user registered: {}", form.email);
    Ok((StatusCode::CREATED, Json(SessionUser { user_id: user.user_id, email: user.email })))
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(handle_register))
        .with_state(state)
}
