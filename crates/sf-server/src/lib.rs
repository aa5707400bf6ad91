//! HTTP server for the storefront engine.
//!
//! This crate provides an axum server exposing the two route shapes to the
//! presentation layer:
//! - `GET /api/routes`: route set of the published build
//! - `GET /api/products/{slug}/{id}`: id-addressed products, build-time only
//! - `GET /api/pages/{slug}/{sub_slug}`: slug-addressed products and pages,
//!   with deferred resolution and background revalidation
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sf_server::{ServerConfig, run_server};
//!
//! let storefront = Arc::new(Storefront::new(source, &cache, StorefrontConfig::default()));
//! storefront.build().await?;
//! run_server(ServerConfig::default(), storefront).await?;
//! ```
//!
//! # Response Contract
//!
//! | Outcome           | Status | Body                            |
//! |-------------------|--------|---------------------------------|
//! | Resolved          | 200    | `{kind, entity, layout}`        |
//! | Deferred          | 202    | `{"deferred": true}`            |
//! | Not found         | 404    | `{"error": "Not found", path}`  |
//! | Source failure    | 503    | `{"error"}`                     |

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use sf_site::Storefront;
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Application version (mixed into etags).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            version: String::new(),
        }
    }
}

/// Create server configuration from storefront config.
#[must_use]
pub fn server_config_from_config(config: &sf_config::Config, version: String) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        version,
    }
}

/// Create the application router for a storefront.
pub fn router(storefront: Arc<Storefront>, version: impl Into<String>) -> axum::Router {
    app::create_router(Arc::new(AppState {
        storefront,
        version: version.into(),
    }))
}

/// Run the server until Ctrl-C.
///
/// The storefront should have been built; before the first build every
/// id-addressed route is a 404.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_server(
    config: ServerConfig,
    storefront: Arc<Storefront>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(storefront, config.version.clone());

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
