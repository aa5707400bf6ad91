//! Route cache abstraction for the storefront engine.
//!
//! This crate provides generic caching traits that decouple cache consumers
//! from the underlying storage mechanism. Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store with etag-based invalidation
//!
//! # Implementations
//!
//! - [`MemoryCache`]: Process-local maps, lost on restart
//! - [`FileCache`]: File-based implementation with version validation
//!
//! A distributed store only needs to implement the two traits.
//!
//! # Example
//!
//! ```
//! use sf_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("routes");
//! bucket.set("shop/scarf-red", "build-1", b"{}");
//! assert_eq!(bucket.get("shop/scarf-red", "build-1"), Some(b"{}".to_vec()));
//! assert_eq!(bucket.get("shop/scarf-red", "build-2"), None);
//! ```

mod ext;
mod file;
mod memory;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs where values are invalidated by an etag.
/// The etag is an opaque string chosen by the caller (e.g., a build generation
/// id or content hash). A cache hit occurs only when both the key and etag
/// match.
///
/// Implementations must make `set` appear atomic to concurrent readers: a
/// `get` returns either the previous value or the new one, never a mix.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `Some(value)` if the key exists **and** was stored with the same
    /// `etag`. Returns `None` on cache miss or etag mismatch.
    ///
    /// If `etag` is an empty string, etag validation is skipped and the cached
    /// data is returned regardless of the stored etag.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key (e.g., route path)
    /// * `etag` - Expected etag for cache validity (empty string skips validation)
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key, regardless of the
    /// previous etag.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key (e.g., route path)
    /// * `etag` - Etag to associate with this entry
    /// * `value` - Raw bytes to cache
    fn set(&self, key: &str, etag: &str, value: &[u8]);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
/// For example, a file-based cache stores each bucket in a separate
/// subdirectory.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name returns handles
    /// that share the same underlying storage.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "routes")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}
