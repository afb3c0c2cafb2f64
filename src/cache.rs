use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600); // 1 hour

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// In-memory cache whose entries expire a fixed time after insertion
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        entry.inserted_at.elapsed() < self.ttl
    }

    /// Returns a clone of the cached value if it has not expired; expired entries are dropped.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some(entry) => self.is_fresh(entry),
            None => {
                debug!(?key, "Cache miss");
                return None;
            }
        };

        if fresh {
            debug!(?key, "Cache hit");
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            debug!(?key, ttl_secs = self.ttl.as_secs(), "Cache expired");
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every expired entry and returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let removed_count = before - self.entries.len();
        if removed_count > 0 {
            debug!(removed_count, "Cleaned up expired cache entries");
        }
        removed_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
