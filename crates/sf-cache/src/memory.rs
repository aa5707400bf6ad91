//! In-memory cache implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket};

/// Stored etag and value.
type Entries = HashMap<String, (String, Vec<u8>)>;

/// Process-local [`Cache`] backed by hash maps.
///
/// Buckets with the same name share storage, so a handle obtained twice sees
/// the same entries. Contents are lost when the cache is dropped.
#[derive(Default)]
pub struct MemoryCache {
    buckets: RwLock<HashMap<String, Arc<RwLock<Entries>>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.write().unwrap();
        let entries = buckets.entry(name.to_owned()).or_default();
        Box::new(MemoryCacheBucket {
            entries: Arc::clone(entries),
        })
    }
}

/// A single bucket of a [`MemoryCache`].
struct MemoryCacheBucket {
    entries: Arc<RwLock<Entries>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap();
        let (stored_etag, value) = entries.get(key)?;
        if !etag.is_empty() && stored_etag != etag {
            return None;
        }
        Some(value.clone())
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_owned(), (etag.to_owned(), value.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("routes");

        assert_eq!(bucket.get("shop/bag", "g1"), None);
        bucket.set("shop/bag", "g1", b"data");
        assert_eq!(bucket.get("shop/bag", "g1"), Some(b"data".to_vec()));
    }

    #[test]
    fn test_etag_mismatch_misses() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("routes");

        bucket.set("k", "g1", b"data");
        assert_eq!(bucket.get("k", "g2"), None);
        assert_eq!(bucket.get("k", ""), Some(b"data".to_vec()));
    }

    #[test]
    fn test_overwrite() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("routes");

        bucket.set("k", "g1", b"old");
        bucket.set("k", "g2", b"new");
        assert_eq!(bucket.get("k", "g1"), None);
        assert_eq!(bucket.get("k", "g2"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_same_name_shares_storage() {
        let cache = MemoryCache::new();
        cache.bucket("routes").set("k", "e", b"shared");
        assert_eq!(cache.bucket("routes").get("k", "e"), Some(b"shared".to_vec()));
    }

    #[test]
    fn test_buckets_are_isolated() {
        let cache = MemoryCache::new();
        cache.bucket("routes").set("k", "e", b"data");
        assert_eq!(cache.bucket("other").get("k", "e"), None);
    }
}
