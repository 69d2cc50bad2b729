use crate::core::error::AppError;
use axum::{http::Uri, response::IntoResponse, response::Response};
use tracing::debug;

/// 404 page for every unmatched route
pub async fn fallback_handler(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No route matched");
    AppError::NotFound(uri.path().to_string()).into_response()
}
