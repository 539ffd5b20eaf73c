// SPDX-License-Identifier: MIT

//! A small bounded, read-through cache used to front durable-store reads.
//!
//! The durable [`crate`] tables are backed by `redb_bincode`, which is cheap
//! to read but not free; hot paths (event lookup by hash, per-participant
//! index lookup) sit behind one of these caches, sized by the node's
//! `CacheSize` configuration option.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Thread-safe, fixed-capacity, read-through LRU cache.
///
/// Misses are not cached automatically: callers fetch from the backend and
/// call [`Cache::insert`] themselves, since the backend fetch is usually
/// fallible while the cache itself is not.
pub struct Cache<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    pub fn remove(&self, key: &K) {
        self.inner.lock().pop(key);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = Cache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        // touch `1` so `2` becomes the LRU entry
        assert_eq!(cache.get(&1), Some("a"));
        cache.insert(3, "c");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn remove_and_clear() {
        let cache: Cache<u32, u32> = Cache::new(4);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.remove(&1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
