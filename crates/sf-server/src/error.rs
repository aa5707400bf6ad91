//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Route resolved to nothing, or was never enumerated.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Content source failed while resolving an uncached route.
    #[error("Content source unavailable: {0}")]
    SourceUnavailable(String),

    /// Response serialization failed.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(path) => (
                StatusCode::NOT_FOUND,
                json!({"error": "Not found", "path": path}),
            ),
            Self::SourceUnavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": message}),
            ),
            Self::Serialize(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": e.to_string()}),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
