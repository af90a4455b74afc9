//! The TTL cache map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use icms_core::{Clock, SystemClock};
use regex::Regex;

use super::config::{CacheConfig, CacheOptions};
use super::stats::{CacheCounters, CacheStats};
use super::sweeper::SweeperHandle;

/// A stored value with the instant it was written.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: TimeDelta,
    /// Write order; breaks ties between equal `stored_at` values.
    sequence: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at > self.ttl
    }

    fn age_key(&self) -> (DateTime<Utc>, u64) {
        (self.stored_at, self.sequence)
    }
}

/// Key/value cache with fixed per-entry TTL and capacity eviction.
///
/// # Semantics
///
/// - An entry is logically absent once `now - stored_at > ttl`, even before
///   it is physically removed. Reads that find such an entry delete it.
/// - When a new key is written into a full cache, the single entry with the
///   oldest `stored_at` is evicted first. This is not LRU: reads do not
///   change eviction order, only writes and [`refresh`](Self::refresh) do.
/// - No operation fails. A poisoned lock is recovered and the map reused.
///
/// The periodic sweep is not running until [`start`](Self::start) is called
/// on an `Arc<TtlCache<_>>`.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    sequence: AtomicU64,
    counters: CacheCounters,
    pub(super) sweeper: Mutex<Option<SweeperHandle>>,
}

impl<V: Clone> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache reading time from the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
            sequence: AtomicU64::new(0),
            counters: CacheCounters::default(),
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn to_delta(ttl: Duration) -> TimeDelta {
        TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Store a value stamped with the current time.
    ///
    /// A new key arriving at capacity evicts the single oldest entry, even
    /// when a smaller per-write `max_size` leaves the cache above it.
    /// Overwriting an existing key never evicts another entry.
    pub fn set(&self, key: impl Into<String>, value: V, options: CacheOptions) {
        let key = key.into();
        let ttl = Self::to_delta(options.ttl.unwrap_or(self.config.default_ttl));
        let capacity = options.max_size.unwrap_or(self.config.max_size).max(1);
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
            sequence: self.next_sequence(),
        };

        let mut entries = self.write_entries();
        if !entries.contains_key(&key) && entries.len() >= capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.age_key())
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                self.counters.evicted();
                tracing::debug!(key = %oldest, "Evicted oldest cache entry");
            }
        }
        entries.insert(key, entry);
    }

    /// Touch an entry: reset its store time to now.
    ///
    /// This extends its expiry and moves it to the back of the eviction
    /// order. Returns false if the key is absent or already expired.
    pub fn refresh(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.write_entries();
        match entries.get(key) {
            None => false,
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                self.counters.expired(1);
                false
            }
            Some(_) => {
                let sequence = self.next_sequence();
                if let Some(entry) = entries.get_mut(key) {
                    entry.stored_at = now;
                    entry.sequence = sequence;
                }
                true
            }
        }
    }

    /// Remove one key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.write_entries().remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Remove every key matching `pattern`; returns how many were removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        before - entries.len()
    }

    /// Remove every key starting with `prefix`; returns how many were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Physically remove all logically expired entries.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        self.counters.expired(removed);
        removed
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Value for `key` if present and unexpired. Expired entries are deleted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.write_entries();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.counters.hit();
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.counters.expired(1);
                self.counters.miss();
                None
            }
            None => {
                self.counters.miss();
                None
            }
        }
    }

    /// Whether `key` is present and unexpired. Does not count as a lookup.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.write_entries();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                self.counters.expired(1);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Read-through helper: return the cached value or compute and store it.
    ///
    /// The lock is not held while `produce` runs, so two concurrent misses
    /// for the same key both compute and the last write wins.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: &str,
        options: CacheOptions,
        produce: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = produce().await?;
        self.set(key, value.clone(), options);
        Ok(value)
    }

    /// Number of entries physically present, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys physically present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icms_core::ManualClock;

    fn cache_with_clock(config: CacheConfig) -> (TtlCache<String>, ManualClock) {
        let clock = ManualClock::at_epoch_2024();
        (TtlCache::with_clock(config, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_get_after_set() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        cache.set("k", "v".to_string(), CacheOptions::default());
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert!(cache.has("k"));
    }

    #[test]
    fn test_expiry_is_lazy_delete() {
        let (cache, clock) = cache_with_clock(CacheConfig::default());
        cache.set("k", "v".to_string(), CacheOptions::ttl(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(10));
        assert!(cache.has("k"), "ttl boundary is inclusive");

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.len(), 1, "still physically present before read");
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_eviction_removes_oldest_stored_at() {
        let (cache, clock) = cache_with_clock(CacheConfig::default().with_max_size(2));
        cache.set("a", "1".to_string(), CacheOptions::default());
        clock.advance(Duration::from_secs(1));
        cache.set("b", "2".to_string(), CacheOptions::default());
        clock.advance(Duration::from_secs(1));

        // Reading does not protect "a".
        assert!(cache.get("a").is_some());
        cache.set("c", "3".to_string(), CacheOptions::default());

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_smaller_per_write_capacity_evicts_one_entry() {
        let (cache, clock) = cache_with_clock(CacheConfig::default().with_max_size(10));
        for key in ["a", "b", "c", "d"] {
            cache.set(key, key.to_string(), CacheOptions::default());
            clock.advance(Duration::from_secs(1));
        }

        cache.set(
            "e",
            "e".to_string(),
            CacheOptions::default().with_max_size(2),
        );

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("e"));
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (cache, _) = cache_with_clock(CacheConfig::default().with_max_size(2));
        cache.set("a", "1".to_string(), CacheOptions::default());
        cache.set("b", "2".to_string(), CacheOptions::default());
        cache.set("a", "1b".to_string(), CacheOptions::default());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("1b"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_refresh_changes_eviction_priority() {
        let (cache, clock) = cache_with_clock(CacheConfig::default().with_max_size(2));
        cache.set("a", "1".to_string(), CacheOptions::default());
        clock.advance(Duration::from_secs(1));
        cache.set("b", "2".to_string(), CacheOptions::default());
        clock.advance(Duration::from_secs(1));

        assert!(cache.refresh("a"));
        cache.set("c", "3".to_string(), CacheOptions::default());

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let (cache, clock) = cache_with_clock(CacheConfig::default());
        cache.set("k", "v".to_string(), CacheOptions::ttl(Duration::from_secs(10)));
        clock.advance(Duration::from_secs(8));
        assert!(cache.refresh("k"));
        clock.advance(Duration::from_secs(8));
        assert!(cache.has("k"));
    }

    #[test]
    fn test_refresh_of_expired_entry_deletes_it() {
        let (cache, clock) = cache_with_clock(CacheConfig::default());
        cache.set("k", "v".to_string(), CacheOptions::ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));
        assert!(!cache.refresh("k"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_invalidate_pattern_returns_count() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        cache.set("dashboard:overview:1", "a".to_string(), CacheOptions::default());
        cache.set("dashboard:widget:hr-summary:1", "b".to_string(), CacheOptions::default());
        cache.set("dashboard:widget:content-stats:1", "c".to_string(), CacheOptions::default());

        let pattern = Regex::new(r"^dashboard:widget:").unwrap();
        assert_eq!(cache.invalidate_pattern(&pattern), 2);
        assert_eq!(cache.keys(), vec!["dashboard:overview:1".to_string()]);
    }

    #[test]
    fn test_invalidate_prefix_and_clear() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        cache.set("x:1", "a".to_string(), CacheOptions::default());
        cache.set("x:2", "b".to_string(), CacheOptions::default());
        cache.set("y:1", "c".to_string(), CacheOptions::default());

        assert_eq!(cache.invalidate_prefix("x:"), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (cache, clock) = cache_with_clock(CacheConfig::default());
        cache.set("short", "a".to_string(), CacheOptions::ttl(Duration::from_secs(5)));
        cache.set("long", "b".to_string(), CacheOptions::ttl(Duration::from_secs(500)));
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        cache.set("k", "v".to_string(), CacheOptions::default());
        cache.get("k");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_get_or_insert_with_computes_once() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        let calls = AtomicU64::new(0);

        for _ in 0..3 {
            let value: Result<String, ()> = cache
                .get_or_insert_with("k", CacheOptions::default(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                })
                .await;
            assert_eq!(value.as_deref(), Ok("computed"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_insert_with_does_not_cache_errors() {
        let (cache, _) = cache_with_clock(CacheConfig::default());
        let result: Result<String, &str> = cache
            .get_or_insert_with("k", CacheOptions::default(), || async { Err("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert!(!cache.has("k"));
    }
}
