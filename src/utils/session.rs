use tower_sessions::Session;
use crate::data::models::{ApiError, LoginError};
use crate::engine::UserId;

pub async fn set_user_session(
    session: &Session,
    user_id: UserId,
    email: &str,
) -> Result<(), LoginError> {
    // new id on login so a pre-login cookie cannot be reused
    session.cycle_id().await?;
    session.insert("logged_in", true).await?;
    session.insert("user_id", user_id).await?;
    session.insert("user_email", email).await?;
    Ok(())
}

pub async fn clear_user_session(session: &Session) -> Result<(), LoginError> {
    session.delete().await?;
    Ok(())
}

pub async fn is_logged_in(session: &Session) -> bool {
    session.get::<bool>("logged_in").await.unwrap_or(None).unwrap_or(false)
}

pub async fn get_current_user_id(session: &Session) -> Option<UserId> {
    if !is_logged_in(session).await {
        return None;
    }

    match session.get::<UserId>("user_id").await {
        Ok(Some(user_id)) => Some(user_id),
        Ok(None) => {
            log::warn!("Session has logged_in=true but no user_id");
            None
        },
        Err(e) => {
            log::error!("Failed to get user_id from session: {}", e);
            None
        }
    }
}

/// The logged-in user, or `ApiError::Unauthorized`.
pub async fn require_user(session: &Session) -> Result<UserId, ApiError> {
    get_current_user_id(session).await.ok_or(ApiError::Unauthorized)
}
