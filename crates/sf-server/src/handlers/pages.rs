//! Slug-addressed endpoint.
//!
//! Never blocks on the content source: unknown paths answer 202 with a
//! deferred placeholder while resolution runs in the background.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sf_site::{RouteKey, RouteResponse};

use crate::error::ServerError;
use crate::handlers::content_response;
use crate::state::AppState;

/// Handle GET /api/pages/{slug}/{sub_slug}.
pub(crate) async fn get_page(
    Path((slug, sub_slug)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let key = RouteKey::new(slug, sub_slug);
    match state.storefront.page(&key) {
        RouteResponse::Resolved(content) => {
            content_response(&state, &headers, &content, state.page_cache_control())
        }
        RouteResponse::Deferred => Ok((
            StatusCode::ACCEPTED,
            [(header::CACHE_CONTROL, "no-store")],
            Json(json!({"deferred": true})),
        )
            .into_response()),
        RouteResponse::NotFound => Err(ServerError::NotFound(key.to_string())),
        RouteResponse::TransientError(message) => Err(ServerError::SourceUnavailable(message)),
    }
}
