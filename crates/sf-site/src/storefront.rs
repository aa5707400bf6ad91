//! Build and serve facade.
//!
//! [`Storefront`] owns the published [`BuildSnapshot`] and the
//! [`StalenessController`] for the slug-addressed shape.
//!
//! # Thread Safety
//!
//! - `snapshot()` returns `Arc<BuildSnapshot>` with minimal locking (just Arc clone)
//! - `build()` is serialized by an async mutex and publishes atomically: the
//!   snapshot is swapped only after enumeration and prerendering succeeded
//! - `page()` never waits on the content source
//!
//! # Cache Generations
//!
//! Every storefront starts under a fresh random generation and every build
//! publishes a new one. A disk-backed route cache therefore gives no warm
//! start: entries written by an earlier process are never read again and stay
//! on disk until the cache directory is wiped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use sf_cache::Cache;
use sf_source::ContentSource;

use crate::clock::{Clock, SystemClock};
use crate::error::SiteError;
use crate::paths;
use crate::resolver::{ContentResolver, Resolution};
use crate::route::{RouteKey, RouteSet};
use crate::staleness::{RouteResponse, StalenessController};

/// Cache bucket holding slug-addressed routes.
const ROUTES_BUCKET: &str = "routes";

/// Configuration for [`Storefront`].
#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    /// Age after which a cached slug-addressed route is revalidated.
    pub revalidate_interval: Duration,
    /// Application version, mixed into presentation etags.
    pub version: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            revalidate_interval: Duration::from_secs(60),
            version: String::new(),
        }
    }
}

impl StorefrontConfig {
    /// Set the revalidation interval.
    #[must_use]
    pub fn with_revalidate_interval(mut self, interval: Duration) -> Self {
        self.revalidate_interval = interval;
        self
    }

    /// Set the application version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Immutable result of one successful build.
#[derive(Debug, Default)]
pub struct BuildSnapshot {
    /// Enumerated routes of both shapes.
    pub routes: RouteSet,
    /// Prerendered id-addressed content, keyed by product id.
    products: HashMap<String, Resolution>,
    /// Cache generation the slug-addressed routes were seeded under.
    pub generation: String,
}

impl BuildSnapshot {
    /// Look up an id-addressed route. Anything not enumerated is not found.
    #[must_use]
    pub fn product_by_id(&self, key: &RouteKey) -> Resolution {
        if !self.routes.contains_id(key) {
            return Resolution::NotFound;
        }
        self.products
            .get(&key.leaf)
            .cloned()
            .unwrap_or(Resolution::NotFound)
    }
}

/// Summary of a successful build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// Generation published by the build.
    pub generation: String,
    /// Number of id-addressed routes.
    pub id_routes: usize,
    /// Number of slug-addressed routes.
    pub slug_routes: usize,
    /// Enumerated routes whose prerender found nothing (content changed
    /// between enumeration and prerendering).
    pub not_found: usize,
    /// Build duration.
    pub elapsed: Duration,
}

/// Storefront engine: route enumeration, prerendering and request handling.
pub struct Storefront {
    config: StorefrontConfig,
    source: Arc<dyn ContentSource>,
    resolver: ContentResolver,
    controller: Arc<StalenessController>,
    /// Current build snapshot (atomically swappable).
    snapshot: RwLock<Arc<BuildSnapshot>>,
    /// Mutex for serializing builds.
    build_lock: tokio::sync::Mutex<()>,
}

impl Storefront {
    /// Create a storefront using the system clock.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>, cache: &dyn Cache, config: StorefrontConfig) -> Self {
        Self::with_clock(source, cache, config, Arc::new(SystemClock))
    }

    /// Create a storefront with an explicit clock.
    #[must_use]
    pub fn with_clock(
        source: Arc<dyn ContentSource>,
        cache: &dyn Cache,
        config: StorefrontConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = ContentResolver::new(Arc::clone(&source));
        let generation = new_generation();
        let controller = Arc::new(StalenessController::new(
            resolver.clone(),
            cache.bucket(ROUTES_BUCKET),
            clock,
            config.revalidate_interval,
            generation.clone(),
        ));
        Self {
            config,
            source,
            resolver,
            controller,
            snapshot: RwLock::new(Arc::new(BuildSnapshot {
                generation,
                ..BuildSnapshot::default()
            })),
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Enumerate and prerender every route, then publish the result.
    ///
    /// Concurrent calls run one after another. On error the previously
    /// published snapshot and route cache generation stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::SourceUnavailable`] if any content source call
    /// fails.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot lock is poisoned.
    pub async fn build(&self) -> Result<BuildReport, SiteError> {
        let _guard = self.build_lock.lock().await;
        let start = Instant::now();

        let routes = paths::enumerate(self.source.as_ref()).await?;
        tracing::debug!(
            id_routes = routes.id_routes().len(),
            slug_routes = routes.slug_routes().len(),
            "Enumerated routes"
        );

        let mut products = HashMap::new();
        for route in routes.id_routes() {
            if products.contains_key(&route.leaf) {
                continue;
            }
            let resolution = self.resolver.resolve_by_id(&route.key()).await?;
            products.insert(route.leaf.clone(), resolution);
        }

        // Product resolution ignores the container, so each leaf is resolved
        // once and reused for every container prefix.
        let mut by_leaf: HashMap<&str, Resolution> = HashMap::new();
        for route in routes.slug_routes() {
            if by_leaf.contains_key(route.leaf.as_str()) {
                continue;
            }
            let resolution = self.resolver.resolve(&route.key()).await?;
            by_leaf.insert(route.leaf.as_str(), resolution);
        }
        let prerendered: Vec<(RouteKey, Resolution)> = routes
            .slug_routes()
            .iter()
            .filter_map(|route| {
                by_leaf
                    .get(route.leaf.as_str())
                    .map(|resolution| (route.key(), resolution.clone()))
            })
            .collect();

        let not_found = products.values().filter(|r| !r.is_found()).count()
            + prerendered.iter().filter(|(_, r)| !r.is_found()).count();
        if not_found > 0 {
            tracing::warn!(not_found, "Enumerated routes resolved to nothing");
        }

        let generation = new_generation();
        for (key, resolution) in prerendered {
            self.controller.seed(&key, &generation, resolution);
        }
        self.controller.set_generation(generation.clone());

        let report = BuildReport {
            generation: generation.clone(),
            id_routes: routes.id_routes().len(),
            slug_routes: routes.slug_routes().len(),
            not_found,
            elapsed: start.elapsed(),
        };
        *self.snapshot.write().unwrap() = Arc::new(BuildSnapshot {
            routes,
            products,
            generation,
        });

        tracing::info!(
            generation = %report.generation,
            id_routes = report.id_routes,
            slug_routes = report.slug_routes,
            elapsed_ms = report.elapsed.as_millis(),
            "Build published"
        );
        Ok(report)
    }

    /// Current build snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BuildSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap())
    }

    /// Route set of the current build.
    #[must_use]
    pub fn routes(&self) -> RouteSet {
        self.snapshot().routes.clone()
    }

    /// Serve an id-addressed route from the current build. No runtime fallback.
    #[must_use]
    pub fn product_by_id(&self, key: &RouteKey) -> Resolution {
        self.snapshot().product_by_id(key)
    }

    /// Serve a slug-addressed route through the staleness controller.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn page(&self, key: &RouteKey) -> RouteResponse {
        self.controller.request(key)
    }

    /// Wait until no background resolution is running.
    pub async fn settle(&self) {
        self.controller.settle().await;
    }
}

/// Random cache generation, unique per storefront and build.
fn new_generation() -> String {
    uuid::Uuid::new_v4().to_string()
}
