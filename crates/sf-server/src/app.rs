//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/routes", get(handlers::routes::get_routes))
        .route(
            "/api/products/{slug}/{id}",
            get(handlers::products::get_product),
        )
        .route(
            "/api/pages/{slug}/{sub_slug}",
            get(handlers::pages::get_page),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::content_type_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use sf_cache::MemoryCache;
    use sf_site::{Storefront, StorefrontConfig};
    use sf_source::{ContainerKind, MockSource};
    use tower::ServiceExt;

    use super::*;

    async fn fixture() -> (Router, Arc<MockSource>, Arc<Storefront>) {
        let source = Arc::new(
            MockSource::new()
                .with_container("shop", ContainerKind::product_page())
                .with_container("about", ContainerKind::product_page())
                .with_container("blog", ContainerKind::blog_home())
                .with_product("p1", "Scarf", Some("Red"))
                .with_blog_page("news-1", "News"),
        );
        let storefront = Arc::new(Storefront::new(
            source.clone(),
            &MemoryCache::new(),
            StorefrontConfig::default(),
        ));
        storefront.build().await.unwrap();
        let state = Arc::new(AppState {
            storefront: Arc::clone(&storefront),
            version: "1.0.0".to_owned(),
        });
        (create_router(state), source, storefront)
    }

    async fn get(router: &Router, uri: &str) -> axum::response::Response {
        router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_routes() {
        let (router, _, storefront) = fixture().await;

        let response = get(&router, "/api/routes").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["generation"], storefront.snapshot().generation);
        assert_eq!(body["idRoutes"].as_array().unwrap().len(), 2);
        assert_eq!(body["idRoutes"][0]["containerSlug"], "shop");
        assert_eq!(body["idRoutes"][0]["leaf"], "p1");
        assert_eq!(body["idRoutes"][0]["kind"], "productById");
        assert_eq!(body["slugRoutes"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_product_by_id() {
        let (router, _, _) = fixture().await;

        let response = get(&router, "/api/products/about/p1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, no-cache");
        assert!(response.headers().contains_key(header::ETAG));

        let body = json(response).await;
        assert_eq!(body["kind"], "product");
        assert_eq!(body["entity"]["id"], "p1");
        assert_eq!(body["entity"]["variant"], "Red");
        assert!(body["layout"].is_object());
    }

    #[tokio::test]
    async fn test_product_by_id_unknown_is_404() {
        let (router, _, _) = fixture().await;

        let response = get(&router, "/api/products/shop/p9").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json(response).await;
        assert_eq!(body["error"], "Not found");
        assert_eq!(body["path"], "/shop/p9");

        let response = get(&router, "/api/products/blog/p1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_if_none_match_returns_304() {
        let (router, _, _) = fixture().await;

        let response = get(&router, "/api/pages/shop/scarf-red").await;
        assert_eq!(response.status(), StatusCode::OK);
        let etag = response.headers()[header::ETAG].clone();

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/pages/shop/scarf-red")
                    .header(header::IF_NONE_MATCH, etag)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_page_prerendered() {
        let (router, _, _) = fixture().await;

        let response = get(&router, "/api/pages/blog/news-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, s-maxage=60, stale-while-revalidate"
        );

        let body = json(response).await;
        assert_eq!(body["kind"], "page");
        assert_eq!(body["entity"]["slug"], "news-1");
    }

    #[tokio::test]
    async fn test_unknown_page_deferred_then_resolved() {
        let (router, source, storefront) = fixture().await;
        source.upsert_product(sf_source::Product {
            id: "p2".to_owned(),
            title: "Hat".to_owned(),
            variant: None,
            price: 20.0,
            description: Value::Null,
            images: Vec::new(),
        });

        let response = get(&router, "/api/pages/shop/hat").await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(json(response).await, serde_json::json!({"deferred": true}));

        storefront.settle().await;

        let response = get(&router, "/api/pages/shop/hat").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["entity"]["id"], "p2");
    }

    #[tokio::test]
    async fn test_unknown_page_resolving_to_nothing_is_404() {
        let (router, _, storefront) = fixture().await;

        let response = get(&router, "/api/pages/shop/missing").await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        storefront.settle().await;

        let response = get(&router, "/api/pages/shop/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["path"], "/shop/missing");
    }

    #[tokio::test]
    async fn test_source_failure_on_uncached_page_is_503() {
        let (router, source, storefront) = fixture().await;
        source.set_unavailable(true);

        let response = get(&router, "/api/pages/shop/missing").await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        storefront.settle().await;

        let response = get(&router, "/api/pages/shop/missing").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(json(response).await["error"].is_string());

        let response = get(&router, "/api/pages/shop/scarf-red").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_security_header() {
        let (router, _, _) = fixture().await;

        for uri in ["/api/routes", "/api/products/shop/p9"] {
            let response = get(&router, uri).await;
            assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        }
    }
}
