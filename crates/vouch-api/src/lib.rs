pub mod auth;
pub mod connections;
pub mod feed;
pub mod invites;
pub mod listings;
pub mod middleware;
pub mod orders;
pub mod profile;

mod util;

use axum::Json;
use axum::http::StatusCode;

/// Error shape for handlers that owe the client a message, not just a
/// status. Plain `StatusCode` stays the error type everywhere else.
pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(serde_json::json!({ "error": message })))
}
