//! Response Cache Module
//!
//! The cache object handed to the HTTP client: a store plus the three
//! background tasks that maintain it.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{
    ByteSize, CacheStore, CachedEntry, EvictionReason, FreshnessMetadata, ResponsePayload,
    StatsSnapshot,
};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::{
    expiry_channel, recency_channel, spawn_expiry_monitor, spawn_recency_actor,
    spawn_size_evictor,
};

// == Response Cache ==
/// In-process HTTP response cache with LRU eviction under a byte budget and
/// TTL expiry.
///
/// Must be created inside a tokio runtime. Dropping it stops its background
/// tasks.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use resource_cache::{ByteSize, FreshnessMetadata, ResponseCache, ResponsePayload};
///
/// # async fn demo() -> resource_cache::error::Result<()> {
/// let cache = ResponseCache::with_max_size(ByteSize::mb(64));
/// cache
///     .store(
///         "https://api.example.com/items/1",
///         ResponsePayload::new(r#"{"id":1}"#),
///         FreshnessMetadata::new().with_ttl(Duration::from_secs(30)),
///     )
///     .await?;
///
/// if let Some(entry) = cache.lookup("https://api.example.com/items/1").await {
///     assert!(entry.cache_hit());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResponseCache {
    store: Arc<CacheStore>,
    tasks: Vec<JoinHandle<()>>,
}

impl ResponseCache {
    // == Constructor ==
    /// Creates a cache and spawns its recency actor, TTL monitor and size evictor.
    pub fn new(config: &Config) -> Self {
        let (recency, recency_rx) = recency_channel(config.recency_queue_capacity);
        let (expiry, expiry_rx) = expiry_channel(config.expiry_queue_capacity);
        let signal = Arc::new(Notify::new());

        let store = Arc::new(CacheStore::new(
            config.max_cache_size.as_u64(),
            recency,
            expiry,
            Arc::clone(&signal),
        ));

        let tasks = vec![
            spawn_recency_actor(recency_rx),
            spawn_expiry_monitor(Arc::clone(&store), expiry_rx),
            spawn_size_evictor(Arc::clone(&store), signal),
        ];

        info!(
            "Response cache initialized: max_size={}, recency_queue={}, expiry_queue={}",
            config.max_cache_size, config.recency_queue_capacity, config.expiry_queue_capacity
        );

        Self { store, tasks }
    }

    /// Creates a cache with default queue sizes and the given byte budget.
    pub fn with_max_size(max_size: ByteSize) -> Self {
        Self::new(&Config::with_max_size(max_size))
    }

    // == Lookup ==
    /// Returns the cached response for `key`, or `None` on a miss.
    pub async fn lookup(&self, key: &str) -> Option<Arc<CachedEntry>> {
        self.store.get(key).await
    }

    // == Store ==
    /// Caches a response under `key`, replacing any previous entry.
    ///
    /// Entries carrying `expires_at` are reaped at that time; all entries are
    /// subject to LRU eviction while the cache is over budget.
    ///
    /// Returns the stored entry with `was_cache_hit() == Some(false)`; it
    /// reports `Some(true)` once a lookup has served it.
    pub async fn store(
        &self,
        key: impl Into<String>,
        payload: ResponsePayload,
        metadata: FreshnessMetadata,
    ) -> Result<Arc<CachedEntry>> {
        self.store.put(key.into(), payload, metadata).await
    }

    // == Invalidate ==
    /// Removes `key` from the cache. Returns false if it was not cached.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.store.evict(key, EvictionReason::Invalidated).await
    }

    // == Capacity ==
    /// Changes the byte budget. Shrinking it below current usage starts an
    /// eviction pass right away.
    pub async fn set_max_size(&self, max_size: ByteSize) {
        self.store.set_max_bytes(max_size.as_u64()).await;
    }

    pub async fn max_size(&self) -> ByteSize {
        ByteSize(self.store.max_bytes().await)
    }

    /// Current aggregate size of cached entries.
    pub async fn size_bytes(&self) -> u64 {
        self.store.used_bytes().await
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.store.stats().await
    }

    // == Index Introspection ==
    /// Keys in the recency index, most recently used first.
    ///
    /// Reflects every index update issued before the call.
    pub async fn recency_order(&self) -> Result<Vec<String>> {
        self.store.recency().snapshot().await
    }

    /// Keys in the expiry index, earliest deadline first.
    pub async fn expiry_order(&self) -> Result<Vec<String>> {
        let tracked = self.store.expiry().snapshot().await?;
        Ok(tracked.into_iter().map(|(_, key)| key).collect())
    }

    #[cfg(test)]
    pub(crate) fn store_handle(&self) -> &CacheStore {
        &self.store
    }
}

impl Drop for ResponseCache {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
