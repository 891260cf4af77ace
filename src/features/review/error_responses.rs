use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::data::models::ApiError;
use crate::engine::EngineError;
use crate::features::json_error;

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidGrade(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::ParseFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Engine(e) => status_for(e),
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        }
        json_error(status, self.to_string())
    }
}
