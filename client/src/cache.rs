//! # Data Cache
//!
//! Process-wide key/value cache with per-entry TTL and a pending marker that
//! callers can check before issuing a duplicate request.
//!
//! Stale entries are still returned (flagged `is_stale`) so a screen can show
//! old data while it revalidates. There is no eviction beyond explicit
//! invalidation.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use joyner::cache::DataCache;
//!
//! let cache = DataCache::new();
//! cache.set("friends:list", vec!["a".to_string()], Duration::from_secs(60));
//! let hit = cache.get::<Vec<String>>("friends:list");
//! assert!(hit.exists && !hit.is_stale);
//! ```

use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Default entry lifetime (5 minutes)
pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_millis(300_000);

struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    expires_in: Duration,
}

impl CacheEntry {
    fn is_stale(&self) -> bool {
        self.stored_at.elapsed() > self.expires_in
    }
}

/// Result of [`DataCache::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<T> {
    pub data: Option<T>,
    pub is_stale: bool,
    pub exists: bool,
}

impl<T> CacheLookup<T> {
    fn miss() -> Self {
        Self {
            data: None,
            is_stale: false,
            exists: false,
        }
    }

    /// Present and within its TTL
    pub fn is_fresh(&self) -> bool {
        self.exists && !self.is_stale
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    pending: HashSet<String>,
}

/// Thread-safe TTL cache, cheap to clone
#[derive(Clone, Default)]
pub struct DataCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `key` and clear its pending marker.
    pub fn set<T>(&self, key: &str, data: T, expires_in: Duration)
    where
        T: Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                data: Arc::new(data),
                stored_at: Instant::now(),
                expires_in,
            },
        );
        inner.pending.remove(key);
        trace!(key, expires_in_ms = expires_in.as_millis() as u64, "Cache set");
    }

    /// [`set`](Self::set) with [`DEFAULT_EXPIRES_IN`]
    pub fn set_default<T>(&self, key: &str, data: T)
    where
        T: Send + Sync + 'static,
    {
        self.set(key, data, DEFAULT_EXPIRES_IN);
    }

    /// Look up `key`. A value stored under a different type reads as absent.
    pub fn get<T>(&self, key: &str) -> CacheLookup<T>
    where
        T: Clone + 'static,
    {
        let inner = self.inner.lock();
        let Some(entry) = inner.entries.get(key) else {
            return CacheLookup::miss();
        };
        match entry.data.downcast_ref::<T>() {
            Some(data) => CacheLookup {
                data: Some(data.clone()),
                is_stale: entry.is_stale(),
                exists: true,
            },
            None => CacheLookup::miss(),
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.lock().pending.contains(key)
    }

    /// Flag a request for `key` as in flight. Advisory only: nothing stops a
    /// caller that does not check [`is_pending`](Self::is_pending).
    pub fn mark_pending(&self, key: &str) {
        self.inner.lock().pending.insert(key.to_string());
    }

    /// Drop the pending marker without touching the entry (failed request)
    pub fn clear_pending(&self, key: &str) {
        self.inner.lock().pending.remove(key);
    }

    /// Remove an entry and its pending marker
    pub fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock();
        inner.entries.remove(key);
        inner.pending.remove(key);
    }

    /// Remove every entry whose key starts with `prefix`; returns how many
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        inner.pending.retain(|key| !key.starts_with(prefix));
        let removed = before - inner.entries.len();
        trace!(prefix, removed, "Cache invalidated by prefix");
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_is_fresh_until_ttl_elapses() {
        let cache = DataCache::new();
        cache.set("k", 7u32, Duration::from_secs(10));

        let hit = cache.get::<u32>("k");
        assert_eq!(
            hit,
            CacheLookup {
                data: Some(7),
                is_stale: false,
                exists: true
            }
        );

        tokio::time::advance(Duration::from_secs(11)).await;
        let stale = cache.get::<u32>("k");
        assert!(stale.is_stale);
        assert!(stale.exists);
        assert_eq!(stale.data, Some(7));
    }

    #[test]
    fn test_missing_and_mistyped_entries_read_as_absent() {
        let cache = DataCache::new();
        assert!(!cache.get::<String>("nope").exists);

        cache.set_default("k", 1u8);
        let lookup = cache.get::<String>("k");
        assert!(!lookup.exists);
        assert!(lookup.data.is_none());
    }

    #[test]
    fn test_set_clears_pending() {
        let cache = DataCache::new();
        cache.mark_pending("friends:list");
        assert!(cache.is_pending("friends:list"));

        cache.set_default("friends:list", Vec::<String>::new());
        assert!(!cache.is_pending("friends:list"));
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = DataCache::new();
        cache.set_default("friends:list", 1);
        cache.set_default("friends:requests", 2);
        cache.set_default("a2a:sessions", 3);
        cache.mark_pending("friends:extra");

        assert_eq!(cache.invalidate_by_prefix("friends:"), 2);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_pending("friends:extra"));
        assert!(cache.get::<i32>("a2a:sessions").is_fresh());

        cache.invalidate("a2a:sessions");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = DataCache::new();
        let other = cache.clone();
        cache.set_default("k", "v".to_string());
        assert_eq!(other.get::<String>("k").data.as_deref(), Some("v"));
        other.clear();
        assert!(cache.is_empty());
    }
}
