//! In-memory cache for storing key-value pairs.
//!
//! Uses moka's high-performance concurrent cache implementation.

use std::time::Duration;

use moka::{
    ops::compute::{CompResult, Op},
    sync::Cache,
};

/// Thread-safe in-memory cache with configurable capacity and optional time-to-live.
///
/// Used for storing:
/// - Active run handles (`MemCache<RunId, Arc<Run>>`)
/// - Tracked device positions (`MemCache<String, Position>`)
/// - Device lock holders (`MemCache<DeviceId, LockHolder>`, with TTL)
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`].
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity as u64),
        }
    }

    /// Allocate a new [`MemCache`] whose entries expire `ttl` after insertion.
    pub fn with_ttl(
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity as u64).time_to_live(ttl).build(),
        }
    }

    /// Insert or replace an entry.
    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    /// Insert `value` only if `key` is vacant.
    ///
    /// Returns the value that already occupied the key when the insert did not happen.
    /// The check and the insert are a single atomic operation.
    pub fn insert_if_absent(
        &self,
        key: K,
        value: V,
    ) -> Option<V> {
        let entry = self.entries.entry(key).or_insert(value);
        if entry.is_fresh() {
            None
        } else {
            Some(entry.into_value())
        }
    }

    /// Get an entry through key `&K`.
    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    /// Remove an entry through key `&K`.
    pub fn remove(
        &self,
        key: &K,
    ) {
        self.entries.invalidate(key);
    }

    /// Remove the entry for `key` only if `predicate` holds for its current value.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_if(
        &self,
        key: K,
        predicate: impl FnOnce(&V) -> bool,
    ) -> bool {
        let result = self.entries.entry(key).and_compute_with(|entry| match entry {
            Some(entry) if predicate(entry.value()) => Op::Remove,
            _ => Op::Nop,
        });
        matches!(result, CompResult::Removed(_))
    }

    /// Return an iterator over the entries of the cache.
    pub fn iter(&self) -> moka::sync::Iter<'_, K, V> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::MemCache;

    #[test]
    fn test_insert_if_absent() {
        let cache: MemCache<String, String> = MemCache::new(16);
        assert_eq!(cache.insert_if_absent("dev".to_string(), "a".to_string()), None);
        assert_eq!(cache.insert_if_absent("dev".to_string(), "b".to_string()), Some("a".to_string()));
        assert_eq!(cache.get(&"dev".to_string()), Some("a".to_string()));

        assert!(!cache.remove_if("dev".to_string(), |owner| owner == "b"));
        assert!(cache.remove_if("dev".to_string(), |owner| owner == "a"));
        assert_eq!(cache.insert_if_absent("dev".to_string(), "b".to_string()), None);
        cache.remove(&"dev".to_string());
        assert_eq!(cache.get(&"dev".to_string()), None);
    }

    #[test]
    fn test_entries_expire() {
        let cache: MemCache<String, u32> = MemCache::with_ttl(16, Duration::from_millis(20));
        cache.set("k".to_string(), 1);
        assert_eq!(cache.get(&"k".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get(&"k".to_string()), None);
    }
}
