//! Cache Engine Module
//!
//! The orchestrator: owns the recency and expiry indexes, delegates value
//! storage to the backend, and enforces the size and age invariants on every
//! mutation.
//!
//! Every public operation runs as one critical section under a single mutex,
//! so concurrent callers never observe the indexes and the backend out of
//! step with each other. The lock covers callers of this engine instance
//! only; whether the backend itself tolerates other processes is the
//! backend's concern.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::cache::entry::{current_timestamp_ms, deadline_ms, EntryMeta};
use crate::cache::expiry::ExpiryIndex;
use crate::cache::recency::RecencyIndex;
use crate::cache::sizeof::{default_sizeof, ByteWeight, SizeOfFn};
use crate::cache::stats::CacheStats;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{MemoryStorage, StorageBackend};

// == Cache Engine ==
/// Size-bounded LRU cache with optional TTL expiry over a pluggable backend.
///
/// Invariants held after every public operation returns:
/// - the recency index, the metadata table, and the backend track exactly
///   the same set of keys;
/// - `total_size` equals the sum of the estimated sizes of live entries;
/// - `total_size` never exceeds `max_size` when one is configured.
pub struct CacheEngine<V, S = MemoryStorage<V>>
where
    S: StorageBackend<V>,
{
    config: Config,
    inner: Mutex<Inner<V, S>>,
}

/// Mutable engine state, guarded by the engine mutex.
struct Inner<V, S> {
    storage: S,
    recency: RecencyIndex,
    expiry: ExpiryIndex,
    meta: HashMap<String, EntryMeta>,
    total_size: u64,
    sizeof: SizeOfFn<V>,
    stats: CacheStats,
}

impl<V, S: StorageBackend<V>> Inner<V, S> {
    fn empty(storage: S, sizeof: SizeOfFn<V>) -> Self {
        Self {
            storage,
            recency: RecencyIndex::new(),
            expiry: ExpiryIndex::new(),
            meta: HashMap::new(),
            total_size: 0,
            sizeof,
            stats: CacheStats::new(),
        }
    }

    /// Fully removes an entry from the backend and all indexes.
    ///
    /// The backend delete runs first so a backend failure leaves the engine
    /// state untouched. Returns whether the key was present.
    fn remove_entry(&mut self, key: &str) -> Result<bool> {
        let size = match self.meta.get(key) {
            Some(meta) => meta.size,
            None => return Ok(false),
        };

        self.storage.delete(key)?;
        self.meta.remove(key);
        self.recency.remove(key);
        self.expiry.clear_key(key);
        self.total_size -= size;

        Ok(true)
    }

    /// Evicts LRU entries until `total_size` is within budget.
    ///
    /// Terminates because every iteration strictly decreases `total_size`.
    /// An empty recency index while over budget means the bookkeeping is
    /// corrupt; it is logged and the loop stops rather than spinning.
    fn enforce_capacity(&mut self, max_size: u64) -> Result<()> {
        while self.total_size > max_size {
            let victim = match self.recency.evict_oldest() {
                Some(key) => key,
                None => {
                    error!(
                        "Recency index empty with total_size={} over max_size={}",
                        self.total_size, max_size
                    );
                    debug_assert!(false, "recency index empty while over size budget");
                    break;
                }
            };

            self.remove_entry(&victim)?;
            self.stats.record_eviction();
            debug!("Evicted LRU entry '{}' under size pressure", victim);
        }

        Ok(())
    }
}

impl<V, S> CacheEngine<V, S>
where
    V: Clone,
    S: StorageBackend<V>,
{
    // == Constructor (custom backend) ==
    /// Creates an engine over the given backend and size estimator.
    ///
    /// Keys already present in the backend (a reopened file store, for
    /// example) are re-indexed: each is sized, given fresh recency in
    /// backend iteration order, and given a fresh max-age deadline when one
    /// is configured. Capacity is enforced immediately afterwards, so the
    /// engine starts within budget.
    pub fn with_storage(config: Config, storage: S, sizeof: SizeOfFn<V>) -> Result<Self> {
        let mut inner = Inner::empty(storage, sizeof);

        let existing = inner.storage.keys()?;
        if !existing.is_empty() {
            let now = current_timestamp_ms();
            for key in existing {
                let value = match inner.storage.get(&key)? {
                    Some(value) => value,
                    None => continue,
                };
                let size = (inner.sizeof)(&value)
                    .ok_or_else(|| CacheError::SizeEstimationFailed(key.clone()))?;

                inner.meta.insert(key.clone(), EntryMeta::new(size));
                inner.total_size += size;
                inner.recency.touch(&key);
                if let Some(max_age) = config.max_age {
                    inner.expiry.set_expiry(&key, deadline_ms(now, max_age));
                }
            }

            info!(
                "Re-indexed {} pre-existing entries ({} bytes) from storage backend",
                inner.meta.len(),
                inner.total_size
            );

            if let Some(max_size) = config.max_size {
                inner.enforce_capacity(max_size)?;
            }
        }

        Ok(Self {
            config,
            inner: Mutex::new(inner),
        })
    }

    // == Set ==
    /// Stores a key-value pair, applying the configured max age if any.
    ///
    /// Replaces any prior value for the key (size re-estimated, recency and
    /// expiry reset), then evicts LRU entries until the cache is back within
    /// its size budget. A value whose size alone exceeds `max_size` is
    /// rejected with `ValueTooLarge` and nothing is mutated.
    pub fn set(&self, key: &str, value: V) -> Result<()> {
        self.set_with_ttl(key, value, None)
    }

    // == Set With TTL ==
    /// Stores a key-value pair with an explicit TTL overriding `max_age`.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.lock();

        let size = (inner.sizeof)(&value)
            .ok_or_else(|| CacheError::SizeEstimationFailed(key.to_string()))?;

        // Reject before mutating anything
        if let Some(max_size) = self.config.max_size {
            if size > max_size {
                return Err(CacheError::ValueTooLarge {
                    key: key.to_string(),
                    size,
                    max_size,
                });
            }
        }

        // Credit back the old value's size before charging the new one, so
        // total_size stays correct at every intermediate step
        inner.remove_entry(key)?;

        inner.storage.set(key, value)?;
        inner.meta.insert(key.to_string(), EntryMeta::new(size));
        inner.total_size += size;
        inner.recency.touch(key);

        if let Some(ttl) = ttl.or(self.config.max_age) {
            let expires_at = deadline_ms(current_timestamp_ms(), ttl);
            inner.expiry.set_expiry(key, expires_at);
        }

        // The just-inserted key is most recent and fits on its own, so the
        // eviction loop can never pick it
        if let Some(max_size) = self.config.max_size {
            inner.enforce_capacity(max_size)?;
        }

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key, marking it most recently used.
    ///
    /// An entry whose max age has elapsed is removed on the spot (lazy
    /// expiry) and reported as `Expired`; an absent key is `NotFound`. Both
    /// count as misses.
    pub fn get(&self, key: &str) -> Result<V> {
        let mut inner = self.lock();

        if !inner.meta.contains_key(key) {
            inner.stats.record_miss();
            return Err(CacheError::NotFound(key.to_string()));
        }

        if inner.expiry.is_expired(key, current_timestamp_ms()) {
            inner.remove_entry(key)?;
            inner.stats.record_expiration();
            inner.stats.record_miss();
            debug!("Lazily removed expired entry '{}'", key);
            return Err(CacheError::Expired(key.to_string()));
        }

        match inner.storage.get(key)? {
            Some(value) => {
                inner.recency.touch(key);
                if let Some(meta) = inner.meta.get_mut(key) {
                    meta.touch();
                }
                inner.stats.record_hit();
                Ok(value)
            }
            None => {
                // Tracked key missing from the backend: repair the indexes
                // and report a miss
                error!("Key '{}' tracked by engine but absent from storage backend", key);
                inner.remove_entry(key)?;
                inner.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Contains ==
    /// Checks whether a key is present and unexpired.
    ///
    /// Performs the same lazy removal as `get` when the entry has expired,
    /// but does not touch recency.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let mut inner = self.lock();

        if !inner.meta.contains_key(key) {
            return Ok(false);
        }

        if inner.expiry.is_expired(key, current_timestamp_ms()) {
            inner.remove_entry(key)?;
            inner.stats.record_expiration();
            debug!("Lazily removed expired entry '{}'", key);
            return Ok(false);
        }

        Ok(true)
    }

    // == Delete ==
    /// Removes an entry by key. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.remove_entry(key)?;
        Ok(())
    }

    // == Clear ==
    /// Removes every entry and resets the size accounting.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock();

        inner.storage.clear()?;
        inner.recency.clear();
        inner.expiry.clear();
        inner.meta.clear();
        inner.total_size = 0;

        Ok(())
    }

    // == Size ==
    /// Returns the total estimated size of live entries, not the entry count.
    pub fn size(&self) -> u64 {
        self.lock().total_size
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.lock().meta.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.lock().meta.is_empty()
    }

    // == Keys ==
    /// Returns all live keys, least recently used first.
    ///
    /// Expired-but-unswept keys are included; this is a snapshot of what is
    /// tracked, not a read of each entry.
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .recency
            .iter_oldest_first()
            .map(str::to_string)
            .collect()
    }

    // == Sweep Expired ==
    /// Removes all entries whose max age has elapsed.
    ///
    /// Returns the number of entries removed. Callers can invoke this
    /// periodically (see `tasks::spawn_sweeper`) or rely purely on lazy
    /// expiry during get/contains.
    pub fn sweep_expired(&self) -> Result<usize> {
        let mut inner = self.lock();
        let now = current_timestamp_ms();

        let expired = inner.expiry.sweep_expired(now);
        let mut removed = 0;

        for key in expired {
            if inner.remove_entry(&key)? {
                inner.stats.record_expiration();
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Expiry sweep removed {} entries", removed);
        }

        Ok(removed)
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.total_entries = inner.meta.len();
        stats.total_size = inner.total_size;
        stats
    }

    // == Config ==
    /// Returns the configuration the engine was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Acquires the engine lock.
    ///
    /// A poisoned lock means a panic escaped a critical section (only user
    /// code - the size estimator - can do that); engine state may be stale
    /// but the structural invariants still hold, so we keep serving.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V, S>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V> CacheEngine<V, MemoryStorage<V>>
where
    V: Clone + ByteWeight,
{
    // == Constructor (defaults) ==
    /// Creates an engine over an empty in-memory backend with the default
    /// byte-length size estimator.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::empty(MemoryStorage::new(), default_sizeof())),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn sized_cache(max_size: u64) -> CacheEngine<String> {
        CacheEngine::new(Config {
            max_size: Some(max_size),
            ..Config::default()
        })
    }

    /// Engine over memory storage charging every value a size of 1.
    fn unit_sized_cache(max_size: u64) -> CacheEngine<String> {
        CacheEngine::with_storage(
            Config {
                max_size: Some(max_size),
                ..Config::default()
            },
            MemoryStorage::new(),
            Box::new(|_| Some(1)),
        )
        .unwrap()
    }

    #[test]
    fn test_engine_new_is_empty() {
        let cache: CacheEngine<String> = CacheEngine::new(Config::default());
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_engine_set_and_get() {
        let cache = CacheEngine::new(Config::default());

        cache.set("key1", "value1".to_string()).unwrap();
        assert_eq!(cache.get("key1").unwrap(), "value1");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 6);
    }

    #[test]
    fn test_engine_get_nonexistent() {
        let cache: CacheEngine<String> = CacheEngine::new(Config::default());
        assert!(matches!(cache.get("missing"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_engine_overwrite_resizes() {
        let cache = CacheEngine::new(Config::default());

        cache.set("key1", "value1".to_string()).unwrap();
        cache.set("key1", "v2".to_string()).unwrap();

        assert_eq!(cache.get("key1").unwrap(), "v2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_engine_delete_is_idempotent() {
        let cache = CacheEngine::new(Config::default());

        cache.set("key1", "value1".to_string()).unwrap();
        cache.delete("key1").unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);

        // Deleting again (and deleting a key that never existed) is a no-op
        cache.delete("key1").unwrap();
        cache.delete("never_there").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_engine_contains() {
        let cache = CacheEngine::new(Config::default());

        cache.set("key1", "value1".to_string()).unwrap();
        assert!(cache.contains("key1").unwrap());
        assert!(!cache.contains("missing").unwrap());
    }

    #[test]
    fn test_engine_clear() {
        let cache = CacheEngine::new(Config::default());

        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.clear().unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_engine_lru_eviction_by_size() {
        let cache = unit_sized_cache(3);

        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.set("c", "3".to_string()).unwrap();

        // Budget exhausted: inserting d evicts a (oldest)
        cache.set("d", "4".to_string()).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(matches!(cache.get("a"), Err(CacheError::NotFound(_))));
        assert!(cache.get("b").is_ok());
        assert!(cache.get("c").is_ok());
        assert!(cache.get("d").is_ok());
    }

    #[test]
    fn test_engine_get_protects_from_eviction() {
        let cache = unit_sized_cache(3);

        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.set("c", "3".to_string()).unwrap();

        // Touch a so b becomes the eviction candidate
        cache.get("a").unwrap();
        cache.set("d", "4".to_string()).unwrap();

        assert!(cache.get("a").is_ok());
        assert!(matches!(cache.get("b"), Err(CacheError::NotFound(_))));
        assert!(cache.get("c").is_ok());
        assert!(cache.get("d").is_ok());
    }

    #[test]
    fn test_engine_multi_entry_eviction() {
        // One large insert can push several small entries out: 9 + 9 = 18
        // over a budget of 12, so a and b both go and c squeaks by
        let cache = sized_cache(12);

        cache.set("a", "123".to_string()).unwrap();
        cache.set("b", "456".to_string()).unwrap();
        cache.set("c", "789".to_string()).unwrap();
        assert_eq!(cache.size(), 9);

        cache.set("big", "123456789".to_string()).unwrap();

        assert_eq!(cache.size(), 12);
        assert!(matches!(cache.get("a"), Err(CacheError::NotFound(_))));
        assert!(matches!(cache.get("b"), Err(CacheError::NotFound(_))));
        assert!(cache.get("c").is_ok());
        assert!(cache.get("big").is_ok());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_engine_value_too_large_rejected() {
        let cache = sized_cache(5);

        let result = cache.set("key1", "0123456789".to_string());
        assert!(matches!(result, Err(CacheError::ValueTooLarge { .. })));

        // No partial mutation
        assert_eq!(cache.size(), 0);
        assert!(cache.is_empty());
        assert!(!cache.contains("key1").unwrap());
    }

    #[test]
    fn test_engine_value_too_large_keeps_prior_entries() {
        let cache = sized_cache(5);

        cache.set("keep", "1234".to_string()).unwrap();
        let result = cache.set("huge", "0123456789".to_string());
        assert!(matches!(result, Err(CacheError::ValueTooLarge { .. })));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("keep").unwrap(), "1234");
    }

    #[test]
    fn test_engine_size_estimation_failure_rejected() {
        let cache: CacheEngine<String, MemoryStorage<String>> = CacheEngine::with_storage(
            Config::default(),
            MemoryStorage::new(),
            Box::new(|v: &String| if v.is_empty() { None } else { Some(v.len() as u64) }),
        )
        .unwrap();

        cache.set("ok", "data".to_string()).unwrap();
        let result = cache.set("bad", String::new());
        assert!(matches!(result, Err(CacheError::SizeEstimationFailed(_))));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 4);
    }

    #[test]
    fn test_engine_expiry_on_get() {
        let cache = CacheEngine::new(Config {
            max_age: Some(Duration::from_millis(40)),
            ..Config::default()
        });

        cache.set("key1", "value1".to_string()).unwrap();
        assert_eq!(cache.get("key1").unwrap(), "value1");

        sleep(Duration::from_millis(60));

        assert!(matches!(cache.get("key1"), Err(CacheError::Expired(_))));
        // Lazy removal took the entry with it
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_engine_expiry_on_contains() {
        let cache = CacheEngine::new(Config {
            max_age: Some(Duration::from_millis(40)),
            ..Config::default()
        });

        cache.set("key1", "value1".to_string()).unwrap();
        assert!(cache.contains("key1").unwrap());

        sleep(Duration::from_millis(60));

        assert!(!cache.contains("key1").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_engine_effectively_unbounded_max_age() {
        // A max_age too large to hold in ms must behave as "never expires",
        // not wrap into a deadline in the past
        let cache = CacheEngine::new(Config {
            max_age: Some(Duration::from_secs(u64::MAX)),
            ..Config::default()
        });

        cache.set("key1", "value1".to_string()).unwrap();

        assert_eq!(cache.get("key1").unwrap(), "value1");
        assert!(cache.contains("key1").unwrap());
        assert_eq!(cache.sweep_expired().unwrap(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_engine_reindex_with_unbounded_max_age() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "123".to_string()).unwrap();

        let cache = CacheEngine::with_storage(
            Config {
                max_age: Some(Duration::from_secs(u64::MAX)),
                ..Config::default()
            },
            storage,
            default_sizeof(),
        )
        .unwrap();

        assert_eq!(cache.get("a").unwrap(), "123");
    }

    #[test]
    fn test_engine_set_refreshes_expiry() {
        let cache = CacheEngine::new(Config {
            max_age: Some(Duration::from_millis(80)),
            ..Config::default()
        });

        cache.set("key1", "v1".to_string()).unwrap();
        sleep(Duration::from_millis(50));

        // Refresh resets the deadline
        cache.set("key1", "v2".to_string()).unwrap();
        sleep(Duration::from_millis(50));

        assert_eq!(cache.get("key1").unwrap(), "v2");
    }

    #[test]
    fn test_engine_per_entry_ttl_overrides_max_age() {
        let cache = CacheEngine::new(Config {
            max_age: Some(Duration::from_secs(3600)),
            ..Config::default()
        });

        cache
            .set_with_ttl("short", "v".to_string(), Some(Duration::from_millis(40)))
            .unwrap();
        cache.set("long", "v".to_string()).unwrap();

        sleep(Duration::from_millis(60));

        assert!(matches!(cache.get("short"), Err(CacheError::Expired(_))));
        assert!(cache.get("long").is_ok());
    }

    #[test]
    fn test_engine_sweep_expired() {
        let cache = CacheEngine::new(Config::default());

        cache
            .set_with_ttl("a", "1".to_string(), Some(Duration::from_millis(30)))
            .unwrap();
        cache
            .set_with_ttl("b", "2".to_string(), Some(Duration::from_millis(30)))
            .unwrap();
        cache
            .set_with_ttl("c", "3".to_string(), Some(Duration::from_secs(3600)))
            .unwrap();
        cache.set("d", "4".to_string()).unwrap();

        sleep(Duration::from_millis(50));

        let removed = cache.sweep_expired().unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("c").is_ok());
        assert!(cache.get("d").is_ok());
        assert_eq!(cache.stats().expirations, 2);
    }

    #[test]
    fn test_engine_keys_oldest_first() {
        let cache = CacheEngine::new(Config::default());

        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.set("c", "3".to_string()).unwrap();
        cache.get("a").unwrap();

        assert_eq!(
            cache.keys(),
            vec!["b".to_string(), "c".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_engine_stats() {
        let cache = unit_sized_cache(2);

        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.get("a").unwrap(); // hit
        let _ = cache.get("missing"); // miss
        cache.set("c", "3".to_string()).unwrap(); // evicts b

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size, 2);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_engine_reindexes_prepopulated_backend() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "123".to_string()).unwrap();
        storage.set("b", "45".to_string()).unwrap();

        let cache = CacheEngine::with_storage(
            Config::default(),
            storage,
            default_sizeof(),
        )
        .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size(), 5);
        assert_eq!(cache.get("a").unwrap(), "123");
    }

    #[test]
    fn test_engine_reindex_enforces_capacity() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "123".to_string()).unwrap();
        storage.set("b", "456".to_string()).unwrap();

        let cache = CacheEngine::with_storage(
            Config {
                max_size: Some(3),
                ..Config::default()
            },
            storage,
            default_sizeof(),
        )
        .unwrap();

        // One of the two entries had to go to fit the budget
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 3);
    }
}
