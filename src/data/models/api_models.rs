use thiserror::Error;

use crate::engine::EngineError;

/// Errors returned by the `/api` handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Not logged in")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
}
