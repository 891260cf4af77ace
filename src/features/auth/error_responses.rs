use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::data::models::{LoginError, RegisterError};
use crate::features::json_error;

impl LoginError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            LoginError::PoolError(_) => StatusCode::SERVICE_UNAVAILABLE,
            LoginError::DatabaseError(_) | LoginError::HashingError(_) | LoginError::SessionError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl RegisterError {
    pub fn status(&self) -> StatusCode {
        match self {
            RegisterError::EmailTaken => StatusCode::CONFLICT,
            RegisterError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RegisterError::PoolError(_) => StatusCode::SERVICE_UNAVAILABLE,
            RegisterError::DatabaseError(_)
            | RegisterError::HashingError(_)
            | RegisterError::SettingsError(_)
            | RegisterError::SessionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Server-side causes are logged in full; the body keeps the short message.
impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("login failed: {:?}", self);
        }
        json_error(status, self.to_string())
    }
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("registration failed: {:?}", self);
        }
        json_error(status, self.to_string())
    }
}
