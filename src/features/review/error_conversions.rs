use diesel::r2d2::PoolError;
use diesel::result::Error as DieselError;
use crate::data::models::ApiError;
use crate::engine::EngineError;

impl From<DieselError> for EngineError {
    fn from(err: DieselError) -> Self {
        EngineError::StoreUnavailable(err.to_string())
    }
}

impl From<PoolError> for EngineError {
    fn from(err: PoolError) -> Self {
        EngineError::StoreUnavailable(err.to_string())
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        ApiError::Engine(err.into())
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
