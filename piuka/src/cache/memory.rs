//! In-memory body cache keyed by URL.
//!
//! Backed by `DashMap`, so reads and writes from many workers never block the
//! runtime on a single lock. Entries are never evicted; a re-fetch of the same
//! URL replaces the previous body.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

/// Cache of bodies fetched in memory mode.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Bytes>,
    /// Statistics - using atomics for lock-free updates
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a body, replacing any previous body for the URL.
    pub fn insert(&self, url: impl Into<String>, body: Bytes) -> Option<Bytes> {
        self.entries.insert(url.into(), body)
    }

    /// Returns the cached body for a URL.
    ///
    /// `Bytes` clones share the underlying buffer, so this never copies the
    /// body.
    pub fn get(&self, url: &str) -> Option<Bytes> {
        match self.entries.get(url) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all cached body sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.value().len() as u64).sum()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = MemoryCache::new();
        assert!(cache.insert("http://a/x", Bytes::from_static(b"abc")).is_none());

        assert_eq!(cache.get("http://a/x"), Some(Bytes::from_static(b"abc")));
        assert_eq!(cache.get("http://a/y"), None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = MemoryCache::new();
        cache.insert("http://a/x", Bytes::from_static(b"old"));
        let previous = cache.insert("http://a/x", Bytes::from_static(b"newer"));

        assert_eq!(previous, Some(Bytes::from_static(b"old")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 5);
        assert!(cache.contains("http://a/x"));
    }
}
