//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use sf_site::Storefront;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Storefront engine holding the published build.
    pub(crate) storefront: Arc<Storefront>,
    /// Application version, mixed into etags.
    pub(crate) version: String,
}

impl AppState {
    /// `Cache-Control` for slug-addressed content, which may be served stale
    /// for one revalidation interval.
    pub(crate) fn page_cache_control(&self) -> String {
        let interval = self.storefront.config().revalidate_interval.as_secs();
        format!("public, s-maxage={interval}, stale-while-revalidate")
    }

    /// `Cache-Control` for id-addressed content. It only changes with a new
    /// build, so clients revalidate against the `ETag` every time.
    pub(crate) fn product_cache_control() -> &'static str {
        "public, no-cache"
    }
}
