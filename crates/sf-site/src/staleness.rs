//! Staleness Controller.
//!
//! Serves the slug-addressed route shape from the route cache and keeps it
//! fresh in the background:
//!
//! - **Miss**: answer [`RouteResponse::Deferred`] and resolve out-of-band. The
//!   result (found or not found) is cached as if it had been enumerated.
//! - **Hit**: answer the cached outcome immediately. Once the entry is at least
//!   one revalidation interval old, a background re-resolution is scheduled and
//!   swaps the entry on success. A failure keeps the old entry.
//! - **Failed first resolution**: remembered, so the next request for that
//!   path gets [`RouteResponse::TransientError`] instead of another
//!   placeholder.
//!
//! At most one background resolution runs per key and generation. Concurrent
//! requests for a key that is already being resolved schedule nothing. A
//! failed re-resolution of a cached entry re-stamps it, so the next attempt
//! waits out another interval.
//!
//! Cache entries are stored under the current build generation as etag, so
//! publishing a new build hides every entry of the previous one. A resolution
//! that started under an older generation writes under that generation and
//! stays invisible; the first request under the new generation schedules its
//! own.
//!
//! Every requested path ends up in the route cache, found or not, and nothing
//! is evicted. Remembered failures are capped at
//! [`DEFAULT_FAILURE_LIMIT`] unless configured otherwise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sf_cache::{CacheBucket, CacheBucketExt};
use tokio::sync::watch;

use crate::clock::Clock;
use crate::resolver::{ContentResolver, Resolution, ResolvedContent};
use crate::route::RouteKey;

/// Outcome of a slug-addressed request, returned synchronously.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteResponse {
    /// Cached content, possibly stale.
    Resolved(Box<ResolvedContent>),
    /// Path not known yet, resolution is running in the background.
    Deferred,
    /// Path resolved to nothing.
    NotFound,
    /// The last background resolution of an uncached path failed.
    TransientError(String),
}

impl From<Resolution> for RouteResponse {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Found(content) => Self::Resolved(content),
            Resolution::NotFound => Self::NotFound,
        }
    }
}

/// Maximum number of remembered first-resolution failures.
pub const DEFAULT_FAILURE_LIMIT: usize = 1024;

/// In-flight registry key: generation plus route.
type FlightKey = (String, RouteKey);

/// Route cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRoute {
    resolved_at_ms: u64,
    resolution: Resolution,
}

/// Route cache with background regeneration and single-flight per key.
pub struct StalenessController {
    resolver: ContentResolver,
    bucket: Box<dyn CacheBucket>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    generation: RwLock<String>,
    in_flight: Mutex<HashMap<FlightKey, watch::Receiver<()>>>,
    failures: Mutex<HashMap<RouteKey, String>>,
    failure_limit: usize,
}

impl StalenessController {
    /// Create a controller.
    ///
    /// `generation` is the cache etag entries are read and written under until
    /// [`set_generation`](Self::set_generation) replaces it. It must not be
    /// empty, since an empty etag disables validation.
    #[must_use]
    pub fn new(
        resolver: ContentResolver,
        bucket: Box<dyn CacheBucket>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        generation: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            bucket,
            clock,
            interval,
            generation: RwLock::new(generation.into()),
            in_flight: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            failure_limit: DEFAULT_FAILURE_LIMIT,
        }
    }

    /// Cap the number of remembered failures. Paths beyond the cap answer
    /// [`RouteResponse::Deferred`] after a failed resolution.
    #[must_use]
    pub fn with_failure_limit(mut self, limit: usize) -> Self {
        self.failure_limit = limit;
        self
    }

    /// Revalidation interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current cache generation.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn generation(&self) -> String {
        self.generation.read().unwrap().clone()
    }

    /// Switch to a new cache generation and forget remembered failures.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn set_generation(&self, generation: impl Into<String>) {
        *self.generation.write().unwrap() = generation.into();
        self.failures.lock().unwrap().clear();
    }

    /// Store a resolution under `generation`, stamped with the current time.
    pub fn seed(&self, key: &RouteKey, generation: &str, resolution: Resolution) {
        let entry = CachedRoute {
            resolved_at_ms: millis(self.clock.now()),
            resolution,
        };
        self.bucket.set_json(&key.cache_key(), generation, &entry);
    }

    /// Answer a request for `key` without waiting on the content source.
    ///
    /// Schedules background work when the entry is missing or stale.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime or if an internal lock is
    /// poisoned.
    pub fn request(self: &Arc<Self>, key: &RouteKey) -> RouteResponse {
        let generation = self.generation();
        let cached: Option<CachedRoute> = self.bucket.get_json(&key.cache_key(), &generation);

        if let Some(cached) = cached {
            if self.is_stale(&cached) {
                tracing::debug!(route = %key, "Serving stale route, revalidating");
                self.schedule(key, generation);
            }
            return cached.resolution.into();
        }

        let failure = self.failures.lock().unwrap().get(key).cloned();
        self.schedule(key, generation);
        match failure {
            Some(message) => RouteResponse::TransientError(message),
            None => RouteResponse::Deferred,
        }
    }

    /// Whether a background resolution for `key` under the current generation
    /// is running.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    #[must_use]
    pub fn is_in_flight(&self, key: &RouteKey) -> bool {
        let flight = (self.generation(), key.clone());
        self.in_flight.lock().unwrap().contains_key(&flight)
    }

    /// Wait until the background resolution for `key` under the current
    /// generation, if any, finishes.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub async fn wait_for(&self, key: &RouteKey) {
        let flight = (self.generation(), key.clone());
        let receiver = self.in_flight.lock().unwrap().get(&flight).cloned();
        if let Some(mut receiver) = receiver {
            // Never sent on: resolves once the sender is dropped.
            let _ = receiver.changed().await;
        }
    }

    /// Wait until no background resolution is running.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn settle(&self) {
        loop {
            let receivers: Vec<_> = self.in_flight.lock().unwrap().values().cloned().collect();
            if receivers.is_empty() {
                return;
            }
            for mut receiver in receivers {
                let _ = receiver.changed().await;
            }
        }
    }

    fn is_stale(&self, cached: &CachedRoute) -> bool {
        let age = millis(self.clock.now()).saturating_sub(cached.resolved_at_ms);
        Duration::from_millis(age) >= self.interval
    }

    /// Spawn a background resolution unless one is already running for `key`
    /// under `generation`.
    fn schedule(self: &Arc<Self>, key: &RouteKey, generation: String) {
        let flight = (generation, key.clone());
        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight.contains_key(&flight) {
            tracing::trace!(route = %key, "Resolution already in flight");
            return;
        }
        let (done, receiver) = watch::channel(());
        in_flight.insert(flight.clone(), receiver);
        drop(in_flight);

        let guard = InFlightGuard {
            controller: Arc::clone(self),
            flight,
            _done: done,
        };
        tokio::spawn(async move {
            let (generation, key) = &guard.flight;
            guard.controller.regenerate(key, generation).await;
        });
    }

    async fn regenerate(&self, key: &RouteKey, generation: &str) {
        let start = Instant::now();
        match self.resolver.resolve(key).await {
            Ok(resolution) => {
                tracing::info!(
                    route = %key,
                    found = resolution.is_found(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Regenerated route"
                );
                self.seed(key, generation, resolution);
                self.failures.lock().unwrap().remove(key);
            }
            Err(e) => {
                let cached: Option<CachedRoute> =
                    self.bucket.get_json(&key.cache_key(), generation);
                tracing::warn!(
                    route = %key,
                    error = %e,
                    keeping_stale = cached.is_some(),
                    "Route regeneration failed"
                );
                match cached {
                    // Re-stamp so the next attempt waits a full interval.
                    Some(cached) => self.seed(key, generation, cached.resolution),
                    None => self.remember_failure(key, generation, e.to_string()),
                }
            }
        }
    }

    fn remember_failure(&self, key: &RouteKey, generation: &str, message: String) {
        if self.generation() != generation {
            return;
        }
        let mut failures = self.failures.lock().unwrap();
        if failures.len() >= self.failure_limit && !failures.contains_key(key) {
            tracing::debug!(route = %key, "Failure limit reached, not remembering");
            return;
        }
        failures.insert(key.clone(), message);
    }
}

/// Clears the in-flight entry, even if the resolution task panics.
///
/// The entry is removed before `_done` drops, so woken waiters never observe
/// the finished key as still in flight.
struct InFlightGuard {
    controller: Arc<StalenessController>,
    flight: FlightKey,
    _done: watch::Sender<()>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.controller.in_flight.lock() {
            in_flight.remove(&self.flight);
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sf_cache::{Cache, MemoryCache};
    use sf_source::{ContainerKind, ContentSource, MockSource, Operation};

    use super::*;
    use crate::clock::ManualClock;
    use crate::resolver::Entity;

    const INTERVAL: Duration = Duration::from_secs(60);

    struct Fixture {
        source: Arc<MockSource>,
        clock: Arc<ManualClock>,
        controller: Arc<StalenessController>,
    }

    fn fixture(source: MockSource) -> Fixture {
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new());
        let cache = MemoryCache::new();
        let controller = Arc::new(StalenessController::new(
            ContentResolver::new(source.clone()),
            cache.bucket("routes"),
            clock.clone(),
            INTERVAL,
            "build-1",
        ));
        Fixture {
            source,
            clock,
            controller,
        }
    }

    fn shop() -> MockSource {
        MockSource::new()
            .with_container("shop", ContainerKind::product_page())
            .with_product("p1", "Scarf", Some("Red"))
    }

    fn product_id(response: &RouteResponse) -> &str {
        match response {
            RouteResponse::Resolved(content) => match &content.entity {
                Entity::Product(product) => &product.id,
                Entity::Page(_) => panic!("expected product, got page"),
            },
            other => panic!("expected resolved product, got {other:?}"),
        }
    }

    /// Resolve `key` through the controller and wait for it to land.
    async fn warm(f: &Fixture, key: &RouteKey) {
        f.controller.request(key);
        f.controller.settle().await;
        f.source.reset_calls();
    }

    #[tokio::test]
    async fn test_unknown_path_deferred_then_resolved() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");

        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        f.controller.wait_for(&key).await;

        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);
    }

    #[tokio::test]
    async fn test_unknown_path_resolving_to_nothing_is_cached() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "missing");

        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        f.controller.settle().await;

        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);
        assert!(!f.controller.is_in_flight(&key));
    }

    #[tokio::test]
    async fn test_fresh_entry_served_without_refetch() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        f.clock.advance(INTERVAL - Duration::from_secs(1));
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        assert!(!f.controller.is_in_flight(&key));

        f.controller.settle().await;
        assert_eq!(f.source.calls(Operation::ProductBySlug), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_served_immediately_and_refetched() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        let mut renamed = f.source.product_by_id("p1").await.unwrap().unwrap();
        renamed.price = 12.5;
        f.source.upsert_product(renamed);
        f.source.reset_calls();
        f.clock.advance(INTERVAL);

        let RouteResponse::Resolved(stale) = f.controller.request(&key) else {
            panic!("expected stale content");
        };
        let Entity::Product(product) = &stale.entity else {
            panic!("expected product");
        };
        assert_eq!(product.price, 10.0);
        assert!(f.controller.is_in_flight(&key));
        assert_eq!(f.source.calls(Operation::ProductBySlug), 0);

        f.controller.wait_for(&key).await;
        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);

        let RouteResponse::Resolved(fresh) = f.controller.request(&key) else {
            panic!("expected fresh content");
        };
        let Entity::Product(product) = &fresh.entity else {
            panic!("expected product");
        };
        assert_eq!(product.price, 12.5);
    }

    #[tokio::test]
    async fn test_single_flight_for_unknown_key() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");

        for _ in 0..10 {
            assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        }
        f.controller.settle().await;

        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);
        assert_eq!(f.source.calls(Operation::Layout), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_while_resolution_is_running() {
        let f = fixture(shop().with_latency(Duration::from_millis(100)));
        let key = RouteKey::new("shop", "scarf-red");
        let other = RouteKey::new("shop", "other");

        f.controller.request(&key);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(f.controller.is_in_flight(&key));

        for _ in 0..5 {
            assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        }
        f.controller.request(&other);
        f.controller.settle().await;

        assert!(!f.controller.is_in_flight(&key));
        assert_eq!(f.source.calls(Operation::ProductBySlug), 2);
    }

    #[tokio::test]
    async fn test_single_flight_for_stale_key() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;
        f.clock.advance(INTERVAL * 2);

        for _ in 0..10 {
            assert_eq!(product_id(&f.controller.request(&key)), "p1");
        }
        f.controller.settle().await;

        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);
    }

    #[tokio::test]
    async fn test_deleted_content_becomes_not_found() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        f.source.remove_product("p1");
        f.clock.advance(INTERVAL);
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        f.controller.settle().await;
        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);

        // The not-found entry waits out the interval like any other.
        f.source.upsert_product(shop().product_by_id("p1").await.unwrap().unwrap());
        f.source.reset_calls();
        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);
        assert!(!f.controller.is_in_flight(&key));

        f.clock.advance(INTERVAL);
        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);
        f.controller.settle().await;
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
    }

    #[tokio::test]
    async fn test_stale_on_error() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        f.source.set_unavailable(true);
        f.clock.advance(INTERVAL);
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        f.controller.settle().await;

        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        assert!(!f.controller.is_in_flight(&key));
        f.controller.settle().await;
        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);
    }

    #[tokio::test]
    async fn test_failed_revalidation_waits_another_interval() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        f.source.set_unavailable(true);
        f.clock.advance(INTERVAL);
        f.controller.request(&key);
        f.controller.settle().await;

        for _ in 0..5 {
            assert_eq!(product_id(&f.controller.request(&key)), "p1");
            f.controller.settle().await;
        }
        assert_eq!(f.source.calls(Operation::ProductBySlug), 1);

        f.source.set_unavailable(false);
        f.clock.advance(INTERVAL);
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
        assert!(f.controller.is_in_flight(&key));
        f.controller.settle().await;
        assert_eq!(f.source.calls(Operation::ProductBySlug), 2);
    }

    #[tokio::test]
    async fn test_failed_first_resolution_reports_transient_error() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        f.source.set_unavailable(true);

        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        f.controller.settle().await;

        let RouteResponse::TransientError(message) = f.controller.request(&key) else {
            panic!("expected transient error");
        };
        assert!(message.contains("Unavailable"), "{message}");
        assert!(f.controller.is_in_flight(&key));

        f.source.set_unavailable(false);
        f.controller.settle().await;
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
    }

    #[tokio::test]
    async fn test_failure_limit_caps_remembered_failures() {
        let source = Arc::new(shop());
        source.set_unavailable(true);
        let controller = Arc::new(
            StalenessController::new(
                ContentResolver::new(source.clone()),
                MemoryCache::new().bucket("routes"),
                Arc::new(ManualClock::new()),
                INTERVAL,
                "build-1",
            )
            .with_failure_limit(1),
        );
        let first = RouteKey::new("shop", "a");
        let second = RouteKey::new("shop", "b");

        controller.request(&first);
        controller.settle().await;
        controller.request(&second);
        controller.settle().await;

        assert!(matches!(
            controller.request(&first),
            RouteResponse::TransientError(_)
        ));
        assert_eq!(controller.request(&second), RouteResponse::Deferred);
        controller.settle().await;
    }

    #[tokio::test]
    async fn test_deleted_blog_page_becomes_not_found() {
        let source = MockSource::new()
            .with_container("blog", ContainerKind::blog_home())
            .with_blog_page("news-1", "News");
        let f = fixture(source);
        let key = RouteKey::new("blog", "news-1");
        warm(&f, &key).await;
        assert!(matches!(
            f.controller.request(&key),
            RouteResponse::Resolved(_)
        ));

        f.source.remove_page("news-1");
        f.clock.advance(INTERVAL);
        assert!(matches!(
            f.controller.request(&key),
            RouteResponse::Resolved(_)
        ));
        f.controller.settle().await;

        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);
    }

    #[tokio::test]
    async fn test_deleted_product_falls_through_to_page() {
        let source = MockSource::new()
            .with_container("shop", ContainerKind::product_page())
            .with_product("p9", "About", None)
            .with_page("about", "About us");
        let f = fixture(source);
        let key = RouteKey::new("shop", "about");
        warm(&f, &key).await;
        assert_eq!(product_id(&f.controller.request(&key)), "p9");

        f.source.remove_product("p9");
        f.clock.advance(INTERVAL);
        f.controller.request(&key);
        f.controller.settle().await;

        let RouteResponse::Resolved(content) = f.controller.request(&key) else {
            panic!("expected page content");
        };
        let Entity::Page(page) = &content.entity else {
            panic!("expected page, got product");
        };
        assert_eq!(page.slug, "about");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_started_before_generation_switch() {
        let f = fixture(shop().with_latency(Duration::from_millis(50)));
        let key = RouteKey::new("shop", "scarf-red");

        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        f.controller.set_generation("build-2");
        assert!(!f.controller.is_in_flight(&key));
        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        assert!(f.controller.is_in_flight(&key));

        f.controller.settle().await;
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
    }

    #[tokio::test]
    async fn test_generation_switch_hides_previous_entries() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "scarf-red");
        warm(&f, &key).await;

        f.controller.set_generation("build-2");
        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
        f.controller.settle().await;
        assert_eq!(product_id(&f.controller.request(&key)), "p1");
    }

    #[tokio::test]
    async fn test_seeded_entry_served_directly() {
        let f = fixture(shop());
        let key = RouteKey::new("shop", "gone");

        f.controller.seed(&key, "build-1", Resolution::NotFound);
        assert_eq!(f.controller.request(&key), RouteResponse::NotFound);
        assert!(!f.controller.is_in_flight(&key));

        f.controller.seed(&key, "build-0", Resolution::NotFound);
        assert_eq!(f.controller.request(&key), RouteResponse::Deferred);
    }
}
