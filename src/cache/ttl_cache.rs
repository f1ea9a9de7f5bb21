/// Short-lived keyed cache with a pluggable clock
///
/// Entries expire `ttl` after insertion and are never handed out afterwards.
/// There is no invalidation API: expiry is the only way a value goes stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// Joins a namespace and request parameters into a cache key.
///
/// `cache_key("compare", &["italy,spain", "cases"])` is
/// `"compare:italy,spain:cases"`.
pub fn cache_key(namespace: &str, parts: &[&str]) -> String {
    let mut key = String::from(namespace);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct TtlCache<V> {
    name: &'static str,
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_clock(name, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a clone of the live value under `key`, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let live = self
            .entries
            .get(key)
            .and_then(|entry| (now < entry.expires_at).then(|| entry.value.clone()));

        match live {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.name, key, "cache hit");
                Some(value)
            }
            None => {
                self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.name, key, "cache miss");
                None
            }
        }
    }

    /// Stores `value`, replacing whatever was there (last writer wins).
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key.into(), CacheEntry { value, expires_at });
    }

    pub fn get_or_insert_with<F>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock("test", Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_entry_visible_until_ttl() {
        let (cache, clock) = cache_with_clock(300);
        cache.insert("predict:7", 42);

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get("predict:7"), Some(42));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("predict:7"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_recomputes_after_expiry() {
        let (cache, clock) = cache_with_clock(10);
        let mut calls = 0;

        let first = cache.get_or_insert_with("k", || {
            calls += 1;
            1
        });
        let second = cache.get_or_insert_with("k", || {
            calls += 1;
            2
        });
        assert_eq!((first, second), (1, 1));

        clock.advance(Duration::from_secs(10));
        let third = cache.get_or_insert_with("k", || {
            calls += 1;
            3
        });
        assert_eq!(third, 3);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_last_writer_wins() {
        let (cache, _clock) = cache_with_clock(10);
        cache.insert("k", 1);
        cache.insert("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock(5);
        cache.insert("old", 1);
        clock.advance(Duration::from_secs(3));
        cache.insert("new", 2);
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("new"), Some(2));
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let (cache, _clock) = cache_with_clock(5);
        assert_eq!(cache.get("missing"), None);
        cache.insert("k", 9);
        assert_eq!(cache.get("k"), Some(9));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(cache_key("hotspots", &["1000"]), "hotspots:1000");
        assert_eq!(
            cache_key("compare", &["italy,spain", "cases"]),
            cache_key("compare", &["italy,spain", "cases"])
        );
        assert_eq!(cache_key("global", &[]), "global");
    }
}
