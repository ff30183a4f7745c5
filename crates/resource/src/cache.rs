//! Shared read-through cache of resource values

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    timestamp: Instant,
}

/// Thread-safe cache of the last known value per query key
///
/// Resources write here after a successful save or refresh and read here
/// before hydrating, so a second resource over the same key does not go back
/// to storage. Values are stored type-erased; a lookup with a different type
/// than was stored misses.
pub struct QueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl QueryCache {
    /// Creates a cache whose entries never expire
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: None,
        }
    }

    /// Creates a cache whose entries expire `ttl` after they are written
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Gets a value if present, of type `T`, and not expired
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.read().get(key).cloned()?;

        if let Some(ttl) = self.ttl
            && entry.timestamp.elapsed() >= ttl
        {
            // Remove expired entry
            self.entries.write().remove(key);
            return None;
        }

        entry.value.downcast_ref::<T>().cloned()
    }

    /// Inserts or replaces the value for `key`
    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            timestamp: Instant::now(),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Drops the value for `key`, returning whether one was cached
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Clears all entries from the cache
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the number of entries in the cache
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
