//! Cache Store Module
//!
//! Main cache engine combining the segmented map with the global recency
//! list and the expiration policy.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::{
    CacheStats, Clock, Entry, ExpirationPolicy, MonotonicClock, RecencyList, SegmentedMap,
    StatsCounter,
};
use crate::error::{CacheError, Result};

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default number of map segments
pub const DEFAULT_SEGMENTS: usize = 16;

// == Cache Config ==
/// Construction-time cache settings. Validated by [`CacheStore::with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries, None = unbounded
    pub max_size: Option<usize>,
    /// Entries unread for longer than this are stale
    pub expire_after_access: Option<Duration>,
    /// Entries written longer ago than this are stale
    pub expire_after_write: Option<Duration>,
    /// Number of map segments, must be a power of two
    pub segments: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: Some(DEFAULT_MAX_ENTRIES),
            expire_after_access: None,
            expire_after_write: None,
            segments: DEFAULT_SEGMENTS,
        }
    }
}

impl CacheConfig {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.max_size = None;
        self
    }

    pub fn expire_after_access(mut self, ttl: Duration) -> Self {
        self.expire_after_access = Some(ttl);
        self
    }

    pub fn expire_after_write(mut self, ttl: Duration) -> Self {
        self.expire_after_write = Some(ttl);
        self
    }

    pub fn segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_size == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_size must be positive".to_string(),
            ));
        }
        if !self.segments.is_power_of_two() {
            return Err(CacheError::InvalidConfig(format!(
                "segments must be a positive power of two, got {}",
                self.segments
            )));
        }
        Ok(())
    }
}

// == Cache Store ==
/// Concurrent LRU cache with optional expire-after-access/write timers.
///
/// Lookups only touch one map segment. Every hit and every write also takes
/// the single recency-list lock, which keeps LRU order global.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key -> entry storage
    map: SegmentedMap<K, V>,
    /// Global recency order; lock taken before any segment lock
    lru: Mutex<RecencyList<K, V>>,
    policy: ExpirationPolicy,
    clock: Arc<dyn Clock>,
    /// Mirror of the list length, readable without the lock
    count: AtomicUsize,
    stats: StatsCounter,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `max_entries` entries with no expiry.
    ///
    /// # Panics
    /// Panics if `max_entries` is 0. Use [`CacheStore::unbounded`] for a cache
    /// without a size limit.
    pub fn new(max_entries: usize) -> Self {
        assert!(max_entries > 0, "max_entries must be positive");
        Self::untimed(Some(max_entries))
    }

    /// Creates a cache with no size limit and no expiry.
    pub fn unbounded() -> Self {
        Self::untimed(None)
    }

    fn untimed(max_size: Option<usize>) -> Self {
        Self::build(
            max_size,
            ExpirationPolicy::default(),
            DEFAULT_SEGMENTS,
            Arc::new(MonotonicClock::new()),
        )
    }

    /// Creates a cache from a validated configuration.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        Self::with_config_and_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a cache from a validated configuration, reading time from `clock`.
    pub fn with_config_and_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let policy = ExpirationPolicy::new(config.expire_after_access, config.expire_after_write)?;

        debug!(
            max_size = ?config.max_size,
            expire_after_access = ?config.expire_after_access,
            expire_after_write = ?config.expire_after_write,
            segments = config.segments,
            "cache configured"
        );

        Ok(Self::build(config.max_size, policy, config.segments, clock))
    }

    fn build(
        max_size: Option<usize>,
        policy: ExpirationPolicy,
        segments: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            map: SegmentedMap::new(segments),
            lru: Mutex::new(RecencyList::new(max_size, policy)),
            policy,
            clock,
            count: AtomicUsize::new(0),
            stats: StatsCounter::new(),
        }
    }

    /// Relative time for expiration checks; the clock is skipped when no
    /// timer is enabled.
    fn now(&self) -> u64 {
        if self.policy.is_timed() {
            self.clock.now_nanos()
        } else {
            0
        }
    }

    // == Get ==
    /// Returns the value for `key`, or None if it is absent or expired.
    ///
    /// A hit promotes the entry to most recently used.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = self.now();
        let entry = match self.map.lookup(key) {
            Some(entry) if !self.policy.is_expired(&entry, now) => entry,
            _ => {
                self.stats.record_miss();
                return None;
            }
        };

        self.stats.record_hit();
        Some(self.read_hit(&entry, now))
    }

    /// Promotes a live entry found by a lookup and returns its value.
    ///
    /// The value is returned even if a concurrent eviction wins the race for
    /// the promotion, since it was live when it was read.
    fn read_hit(&self, entry: &Arc<Entry<K, V>>, now: u64) -> V
    where
        V: Clone,
    {
        self.promote(entry, now);
        entry.value().clone()
    }

    // == Contains Key ==
    /// Checks for a live entry without promoting it or counting a hit.
    pub fn contains_key(&self, key: &K) -> bool {
        let now = self.now();
        self.map
            .lookup(key)
            .is_some_and(|entry| !self.policy.is_expired(&entry, now))
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The previous entry gives up its list slot regardless of age; the new
    /// entry is linked at the head and the tail is trimmed to budget.
    pub fn put(&self, key: K, value: V) {
        let now = self.now();
        let (entry, previous) = self.map.insert(key, value, now);

        let mut lru = self.lru.lock();
        if let Some(previous) = previous {
            lru.retire(&previous);
        }
        match lru.promote(&entry, now, &self.map) {
            Some(evicted) => self.record_evictions(evicted),
            None => trace!("entry superseded before it was linked"),
        }
        self.count.store(lru.len(), Ordering::Relaxed);
    }

    // == Invalidate ==
    /// Removes `key` from the cache. Absent keys are ignored.
    pub fn invalidate(&self, key: &K) {
        if let Some(entry) = self.map.remove(key) {
            let mut lru = self.lru.lock();
            lru.retire(&entry);
            self.count.store(lru.len(), Ordering::Relaxed);
            trace!("entry invalidated");
        }
    }

    // == Invalidate All ==
    /// Removes every entry from the cache.
    pub fn invalidate_all(&self) {
        let drained = self.map.drain();
        let mut lru = self.lru.lock();
        for entry in &drained {
            lru.retire(entry);
        }
        self.count.store(lru.len(), Ordering::Relaxed);
        debug!(removed = drained.len(), "cache invalidated");
    }

    // == Refresh ==
    /// Evicts expired entries from the tail without waiting for the next write.
    ///
    /// Returns the number of entries removed.
    pub fn refresh(&self) -> usize {
        let now = self.now();
        let mut lru = self.lru.lock();
        let evicted = lru.evict(now, &self.map);
        self.count.store(lru.len(), Ordering::Relaxed);
        drop(lru);

        self.record_evictions(evicted);
        evicted
    }

    // == Count ==
    /// Returns the number of live entries.
    ///
    /// Read without locking, so it is only a snapshot under concurrent writes.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.count())
    }

    fn promote(&self, entry: &Arc<Entry<K, V>>, now: u64) {
        let mut lru = self.lru.lock();
        let promoted = lru.promote(entry, now, &self.map);
        self.count.store(lru.len(), Ordering::Relaxed);
        drop(lru);

        match promoted {
            Some(evicted) => self.record_evictions(evicted),
            None => trace!("promotion skipped, entry already removed"),
        }
    }

    fn record_evictions(&self, evicted: usize) {
        if evicted > 0 {
            trace!(evicted, "evicted entries from tail");
            self.stats.record_evictions(evicted);
        }
    }

    // == Consistency Check ==
    /// Asserts that the map and the recency list agree: every mapped entry is
    /// linked exactly once and every linked entry is mapped.
    ///
    /// Only meaningful while no other thread is using the cache.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) {
        use std::collections::HashSet;

        let lru = self.lru.lock();
        let linked = lru.check_invariants();
        let mapped = self.map.entries();

        let linked_ptrs: HashSet<_> = linked.iter().map(Arc::as_ptr).collect();
        assert_eq!(linked_ptrs.len(), linked.len(), "entry linked twice");
        for entry in &mapped {
            assert!(
                linked_ptrs.contains(&Arc::as_ptr(entry)),
                "mapped entry is not linked"
            );
        }
        assert_eq!(mapped.len(), linked.len(), "linked entry is not mapped");
        assert_eq!(self.count(), linked.len(), "count mirror is stale");
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn keys_by_recency(&self) -> Vec<K> {
        self.lru.lock().keys()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Link, ManualClock};

    fn timed(config: CacheConfig) -> (CacheStore<&'static str, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = CacheStore::with_config_and_clock(config, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<String, String> = CacheStore::new(100);
        assert_eq!(store.count(), 0);
        store.check_consistency();
    }

    #[test]
    fn test_store_put_and_get() {
        let store = CacheStore::new(100);

        store.put("key1".to_string(), "value1".to_string());
        let value = store.get(&"key1".to_string());

        assert_eq!(value.as_deref(), Some("value1"));
        assert_eq!(store.count(), 1);
        store.check_consistency();
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store: CacheStore<&str, u32> = CacheStore::new(100);
        assert!(store.get(&"nonexistent").is_none());
    }

    #[test]
    fn test_store_invalidate() {
        let store = CacheStore::new(100);

        store.put("key1", 1);
        store.invalidate(&"key1");

        assert_eq!(store.count(), 0);
        assert!(store.get(&"key1").is_none());
        store.check_consistency();

        store.put("key1", 2);
        assert_eq!(store.get(&"key1"), Some(2));
    }

    #[test]
    fn test_store_invalidate_nonexistent() {
        let store: CacheStore<&str, u32> = CacheStore::new(100);

        store.invalidate(&"nonexistent");
        store.invalidate(&"nonexistent");
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_store_overwrite() {
        let store = CacheStore::new(100);

        store.put("key1", 1);
        store.put("key1", 2);

        assert_eq!(store.get(&"key1"), Some(2));
        assert_eq!(store.count(), 1);
        store.check_consistency();
    }

    #[test]
    fn test_store_lru_eviction() {
        let store = CacheStore::new(2);

        store.put("a", 1);
        store.put("b", 2);
        store.put("c", 3);

        assert_eq!(store.count(), 2);
        assert!(store.get(&"a").is_none());
        assert_eq!(store.get(&"b"), Some(2));
        assert_eq!(store.get(&"c"), Some(3));
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let store = CacheStore::new(2);

        store.put("a", 1);
        store.put("b", 2);

        // Access a to make it most recently used
        assert_eq!(store.get(&"a"), Some(1));

        // Adding c should evict b (now oldest)
        store.put("c", 3);

        assert_eq!(store.keys_by_recency(), vec!["c", "a"]);
        assert!(store.get(&"b").is_none());
    }

    #[test]
    fn test_store_overwrite_promotes() {
        let store = CacheStore::new(2);

        store.put("a", 1);
        store.put("b", 2);
        store.put("a", 10);
        store.put("c", 3);

        assert_eq!(store.keys_by_recency(), vec!["c", "a"]);
        store.check_consistency();
    }

    #[test]
    fn test_store_unbounded() {
        let store = CacheStore::unbounded();
        for i in 0..5_000 {
            store.put(i, i);
        }
        assert_eq!(store.count(), 5_000);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    #[should_panic(expected = "max_entries must be positive")]
    fn test_store_new_rejects_zero() {
        let _ = CacheStore::<u32, u32>::new(0);
    }

    #[test]
    fn test_hit_evicted_before_promotion_still_returns_value() {
        let store = CacheStore::new(1);
        store.put("a", 1);

        // A reader has found "a" but not yet promoted it
        let entry = store.map.lookup(&"a").unwrap();
        store.put("b", 2);
        assert_eq!(entry.link(), Link::Deleted);

        assert_eq!(store.read_hit(&entry, store.now()), 1);
        // The lost promotion neither relinks nor remaps the evicted entry
        assert_eq!(entry.link(), Link::Deleted);
        assert!(!store.contains_key(&"a"));
        assert_eq!(store.keys_by_recency(), vec!["b"]);
        assert_eq!(store.stats().evictions, 1);
        store.check_consistency();
    }

    #[test]
    fn test_stale_reader_does_not_rewind_access_time() {
        let (store, clock) =
            timed(CacheConfig::default().expire_after_access(Duration::from_secs(10)));
        store.put("a", 1);
        let entry = store.map.lookup(&"a").unwrap();

        // One reader samples the clock, then another promotes at a later time
        let earlier = store.now();
        clock.advance(Duration::from_secs(8));
        assert_eq!(store.get(&"a"), Some(1));
        assert_eq!(store.read_hit(&entry, earlier), 1);

        clock.advance(Duration::from_secs(8));
        assert_eq!(store.get(&"a"), Some(1));
    }

    #[test]
    fn test_store_expire_after_write() {
        let (store, clock) =
            timed(CacheConfig::default().expire_after_write(Duration::from_secs(10)));

        store.put("a", 1);
        clock.advance(Duration::from_secs(10));
        // Reads do not extend a write timer
        assert_eq!(store.get(&"a"), Some(1));

        clock.advance(Duration::from_secs(1));
        assert!(store.get(&"a").is_none());
        assert!(!store.contains_key(&"a"));
    }

    #[test]
    fn test_store_expire_after_access_extended_by_reads() {
        let (store, clock) =
            timed(CacheConfig::default().expire_after_access(Duration::from_secs(10)));

        store.put("a", 1);
        for _ in 0..5 {
            clock.advance(Duration::from_secs(8));
            assert_eq!(store.get(&"a"), Some(1));
        }

        clock.advance(Duration::from_secs(11));
        assert!(store.get(&"a").is_none());
    }

    #[test]
    fn test_store_expired_tail_evicted_on_put() {
        let (store, clock) =
            timed(CacheConfig::default().expire_after_write(Duration::from_secs(5)));

        store.put("a", 1);
        store.put("b", 2);
        clock.advance(Duration::from_secs(6));
        store.put("c", 3);

        assert_eq!(store.count(), 1);
        assert_eq!(store.stats().evictions, 2);
        store.check_consistency();
    }

    #[test]
    fn test_store_refresh() {
        let (store, clock) =
            timed(CacheConfig::default().expire_after_write(Duration::from_secs(5)));

        store.put("a", 1);
        clock.advance(Duration::from_secs(3));
        store.put("b", 2);
        clock.advance(Duration::from_secs(3));

        assert_eq!(store.refresh(), 1);
        assert_eq!(store.count(), 1);
        assert!(store.contains_key(&"b"));
        store.check_consistency();
    }

    #[test]
    fn test_store_invalidate_all() {
        let store = CacheStore::new(100);
        for i in 0..10 {
            store.put(i, i);
        }

        store.invalidate_all();

        assert_eq!(store.count(), 0);
        assert!(store.get(&3).is_none());
        store.check_consistency();
    }

    #[test]
    fn test_store_stats() {
        let store = CacheStore::new(1);

        store.put("a", 1);
        store.get(&"a"); // hit
        store.get(&"nonexistent"); // miss
        store.put("b", 2); // evicts a

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_config_rejects_zero_max_size() {
        let result = CacheStore::<u32, u32>::with_config(CacheConfig::default().max_size(0));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_zero_durations() {
        let result = CacheStore::<u32, u32>::with_config(
            CacheConfig::default().expire_after_access(Duration::ZERO),
        );
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let result = CacheStore::<u32, u32>::with_config(
            CacheConfig::default().expire_after_write(Duration::ZERO),
        );
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_bad_segment_count() {
        for segments in [0, 3, 12] {
            let result =
                CacheStore::<u32, u32>::with_config(CacheConfig::default().segments(segments));
            assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_untimed_cache_never_reads_clock() {
        let clock = Arc::new(ManualClock::new());
        let store =
            CacheStore::with_config_and_clock(CacheConfig::default(), clock.clone()).unwrap();

        store.put("a", 1);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(store.get(&"a"), Some(1));
    }
}
