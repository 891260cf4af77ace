pub mod auth;
pub mod review;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// `{"error", "status"}` body shared by every JSON endpoint.
pub(crate) fn json_error(status: StatusCode, message: String) -> Response {
    let body = json!({
        "error": message,
        "status": status.as_u16()
    });
    (status, axum::Json(body)).into_response()
}
