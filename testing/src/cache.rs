//! In-memory cache.

use conference_core::cache::Cache;
use conference_core::error::CacheError;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// `HashMap`-backed [`Cache`]. Cloning shares the underlying data.
///
/// # Example
///
/// ```
/// use conference_testing::InMemoryCache;
/// use conference_core::cache::Cache;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = InMemoryCache::new();
/// cache.set("greeting", "hello".to_string()).await?;
/// assert_eq!(cache.get("greeting").await?, Some("hello".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryCache {
    data: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous peek for assertions.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.data.read().unwrap().get(key).cloned()
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().unwrap().contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }

    /// Make every operation fail with [`CacheError`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError("in-memory cache marked failing".into()))
        } else {
            Ok(())
        }
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
        let result = self.check().map(|()| self.entry(key));
        Box::pin(async move { result })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, Result<(), CacheError>> {
        let result = self.check().map(|()| {
            self.data.write().unwrap().insert(key.to_string(), value);
        });
        Box::pin(async move { result })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), CacheError>> {
        let result = self.check().map(|()| {
            self.data.write().unwrap().remove(key);
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "v".into()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".into()));

        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failing_cache_rejects_operations() {
        let cache = InMemoryCache::new();
        cache.set_failing(true);
        assert!(cache.set("k", "v".into()).await.is_err());
        assert!(!cache.contains_key("k"));
    }
}
