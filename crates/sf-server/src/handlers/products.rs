//! Id-addressed product endpoint.
//!
//! Served from the published build only. Anything not enumerated is a 404.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use sf_site::{Resolution, RouteKey};

use crate::error::ServerError;
use crate::handlers::content_response;
use crate::state::AppState;

/// Handle GET /api/products/{slug}/{id}.
pub(crate) async fn get_product(
    Path((slug, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let key = RouteKey::new(slug, id);
    match state.storefront.product_by_id(&key) {
        Resolution::Found(content) => content_response(
            &state,
            &headers,
            &content,
            AppState::product_cache_control().to_owned(),
        ),
        Resolution::NotFound => Err(ServerError::NotFound(key.to_string())),
    }
}
