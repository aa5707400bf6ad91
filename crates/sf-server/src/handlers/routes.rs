//! Routes API endpoint.
//!
//! Returns the route set of the published build.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use sf_site::ResolvedRoute;

use crate::state::AppState;

/// Response for GET /api/routes.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoutesResponse {
    /// Build generation the routes belong to.
    generation: String,
    /// Id-addressed routes.
    id_routes: Vec<ResolvedRoute>,
    /// Slug-addressed routes.
    slug_routes: Vec<ResolvedRoute>,
}

/// Handle GET /api/routes.
pub(crate) async fn get_routes(State(state): State<Arc<AppState>>) -> Json<RoutesResponse> {
    let snapshot = state.storefront.snapshot();
    Json(RoutesResponse {
        generation: snapshot.generation.clone(),
        id_routes: snapshot.routes.id_routes().to_vec(),
        slug_routes: snapshot.routes.slug_routes().to_vec(),
    })
}
