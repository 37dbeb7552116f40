//! Keyed query cache with optimistic mutation support.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use parking_lot::RwLock;

/// Hierarchical cache key such as `["patients", "<id>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// True when `prefix` matches the leading parts of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<&str> for QueryKey {
    fn from(part: &str) -> Self {
        Self::new([part])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    stale: bool,
}

pub struct QueryCache<V> {
    entries: RwLock<HashMap<QueryKey, CacheEntry<V>>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<V> {
        self.entries.read().get(key).map(|entry| entry.data.clone())
    }

    /// Store fresh data for `key`.
    pub fn set(&self, key: QueryKey, data: V) {
        self.entries.write().insert(
            key,
            CacheEntry {
                data,
                stale: false,
            },
        );
    }

    pub fn remove(&self, key: &QueryKey) -> Option<V> {
        self.entries.write().remove(key).map(|entry| entry.data)
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write();
        let mut marked = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.read().get(key).map_or(true, |entry| entry.stale)
    }

    pub fn optimistic(&self, key: QueryKey) -> OptimisticUpdate<'_, V> {
        OptimisticUpdate { cache: self, key }
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies a predicted value to the cache while a mutation is in flight.
///
/// On failure the previous value is put back (or the entry removed if there
/// was none). Either way the key is invalidated once the mutation settles so
/// the next read reconciles with the server.
pub struct OptimisticUpdate<'a, V> {
    cache: &'a QueryCache<V>,
    key: QueryKey,
}

impl<'a, V: Clone> OptimisticUpdate<'a, V> {
    pub async fn run<U, F, T, E>(self, updater: U, mutation: F) -> Result<T, E>
    where
        U: FnOnce(Option<&V>) -> V,
        F: Future<Output = Result<T, E>>,
    {
        let snapshot = self.cache.get(&self.key);
        let optimistic = updater(snapshot.as_ref());
        self.cache.set(self.key.clone(), optimistic);

        let result = mutation.await;

        if result.is_err() {
            tracing::debug!(key = %self.key, "Mutation failed, restoring cached value");
            match snapshot {
                Some(previous) => self.cache.set(self.key.clone(), previous),
                None => {
                    self.cache.remove(&self.key);
                }
            }
        }

        self.cache.invalidate(&self.key);
        result
    }
}
