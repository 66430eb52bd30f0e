//! Cache Store Module
//!
//! Keyed map of cached responses guarded by a read/write lock. The store is
//! the point of truth for what is cached; it keeps the recency and expiry
//! indexes in step by posting commands to their owning tasks while holding
//! the lock, so each index sees mutations in map order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::{
    estimate_size, ByteBudget, CacheStats, CachedEntry, EvictionReason, ExpiryHandle,
    FreshnessMetadata, ResponsePayload, StatsSnapshot,
};
use crate::error::{CacheError, Result};
use crate::tasks::{ExpirySender, RecencySender};

#[derive(Debug)]
struct StoreState {
    entries: HashMap<String, Arc<CachedEntry>>,
    budget: ByteBudget,
    next_ticket: u64,
}

// == Cache Store ==
/// Map of normalized request keys to cached responses.
#[derive(Debug)]
pub struct CacheStore {
    state: RwLock<StoreState>,
    recency: RecencySender,
    expiry: ExpirySender,
    /// Wakes the size evictor; a stored permit coalesces repeated signals
    evictor: Arc<Notify>,
    stats: CacheStats,
    poisoned: AtomicBool,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_bytes` - Byte budget for all entries
    /// * `recency` - Queue of the recency actor
    /// * `expiry` - Queue of the TTL monitor
    /// * `evictor` - Signal observed by the size evictor
    pub fn new(
        max_bytes: u64,
        recency: RecencySender,
        expiry: ExpirySender,
        evictor: Arc<Notify>,
    ) -> Self {
        Self {
            state: RwLock::new(StoreState {
                entries: HashMap::new(),
                budget: ByteBudget::new(max_bytes),
                next_ticket: 0,
            }),
            recency,
            expiry,
            evictor,
            stats: CacheStats::new(),
            poisoned: AtomicBool::new(false),
        }
    }

    // == Get ==
    /// Looks up a key under the shared lock.
    ///
    /// A hit marks the entry as served from cache and queues a move to the
    /// front of the recency order. Entries past their deadline that the TTL
    /// monitor has not reaped yet count as misses.
    pub async fn get(&self, key: &str) -> Option<Arc<CachedEntry>> {
        let state = self.state.read().await;

        let entry = match state.entries.get(key) {
            Some(entry) if !entry.is_expired() => Arc::clone(entry),
            _ => {
                self.stats.record_miss();
                return None;
            }
        };

        // Posted under the lock so the handle cannot be removed first
        if let Err(err) = self.recency.move_to_front(entry.recency_handle()).await {
            warn!("Dropping recency update for '{}': {}", key, err);
        }
        drop(state);

        entry.mark_hit();
        self.stats.record_hit();
        Some(entry)
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`.
    ///
    /// An existing entry is evicted first so that no key ever owns two
    /// recency or expiry handles. Signals the size evictor if the insert
    /// pushes usage over budget.
    ///
    /// The returned entry is marked fresh until its first cache hit.
    ///
    /// # Errors
    /// - `InvalidKey` for an empty key
    /// - `InvalidMetadata` when `expires_at` is in the past
    /// - `EntryTooLarge` when the entry alone exceeds the budget
    /// - `InvariantViolation` once the store has been poisoned
    /// - `ActorStopped` when a background task is gone
    pub async fn put(
        &self,
        key: String,
        payload: ResponsePayload,
        metadata: FreshnessMetadata,
    ) -> Result<Arc<CachedEntry>> {
        if self.is_poisoned() {
            return Err(CacheError::InvariantViolation(
                "store poisoned by byte accounting drift".to_string(),
            ));
        }
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".to_string()));
        }
        let deadline = metadata.deadline()?;
        let size = estimate_size(&key, &payload, &metadata);

        let (entry, over_budget) = {
            let mut state = self.state.write().await;

            let max = state.budget.max();
            if size > max {
                return Err(CacheError::EntryTooLarge { size, max });
            }

            if let Some(old) = state.entries.remove(&key) {
                self.release(&mut state, &old, EvictionReason::Replaced).await;
            }

            let ticket = state.next_ticket;
            state.next_ticket += 1;
            let entry = Arc::new(CachedEntry::new(
                key.clone(),
                payload,
                metadata,
                ticket,
                deadline,
            ));

            self.recency
                .push_front(entry.recency_handle(), key.clone())
                .await?;
            if let (Some(handle), Some(deadline)) = (entry.expiry_handle(), entry.deadline()) {
                if let Err(err) = self.expiry.insert(handle, key.clone(), deadline).await {
                    // Keep the recency index in step with the map we are not updating
                    if let Err(undo) = self.recency.remove(entry.recency_handle()).await {
                        warn!("Recency rollback for '{}' lost: {}", entry.key(), undo);
                    }
                    return Err(err);
                }
            }

            entry.mark_fresh();
            state.budget.charge(entry.approx_size());
            state.entries.insert(key, Arc::clone(&entry));
            debug!(
                "Stored '{}' ({} bytes, {} in use)",
                entry.key(),
                entry.approx_size(),
                state.budget.used()
            );

            let over_budget = state.budget.is_exceeded();
            (entry, over_budget)
        };

        if over_budget {
            self.evictor.notify_one();
        }
        Ok(entry)
    }

    // == Evict ==
    /// Removes `key` from the map and both indexes. Returns false if absent.
    pub async fn evict(&self, key: &str, reason: EvictionReason) -> bool {
        let mut state = self.state.write().await;
        match state.entries.remove(key) {
            Some(entry) => {
                self.release(&mut state, &entry, reason).await;
                true
            }
            None => false,
        }
    }

    // == Evict Expired ==
    /// Removes keys reaped by the TTL monitor.
    ///
    /// A key is only evicted while it still holds the reaped handle; an
    /// entry stored again under the same key in the meantime is kept.
    pub async fn evict_expired(&self, expired: Vec<(String, ExpiryHandle)>) -> usize {
        let mut state = self.state.write().await;
        let mut evicted = 0;

        for (key, handle) in expired {
            let current = state
                .entries
                .get(&key)
                .map_or(false, |entry| entry.expiry_handle() == Some(handle));
            if !current {
                continue;
            }
            if let Some(entry) = state.entries.remove(&key) {
                self.release(&mut state, &entry, EvictionReason::Expired)
                    .await;
                evicted += 1;
            }
        }

        evicted
    }

    /// Drops an entry already taken out of the map from both indexes and
    /// the byte budget.
    async fn release(&self, state: &mut StoreState, entry: &CachedEntry, reason: EvictionReason) {
        if let Err(err) = self.recency.remove(entry.recency_handle()).await {
            warn!("Recency removal for '{}' lost: {}", entry.key(), err);
        }
        // Expired entries were already popped by the monitor
        if reason != EvictionReason::Expired {
            if let Some(handle) = entry.expiry_handle() {
                if let Err(err) = self.expiry.remove(handle).await {
                    warn!("Expiry removal for '{}' lost: {}", entry.key(), err);
                }
            }
        }

        state.budget.release(entry.approx_size());
        self.stats.record_eviction(reason);
        debug!(
            "Evicted '{}' ({:?}, {} bytes, {} in use)",
            entry.key(),
            reason,
            entry.approx_size(),
            state.budget.used()
        );
    }

    // == Budget ==
    /// Changes the byte budget, signaling the size evictor if usage now exceeds it.
    pub async fn set_max_bytes(&self, max_bytes: u64) {
        let exceeded = {
            let mut state = self.state.write().await;
            state.budget.set_max(max_bytes);
            info!(
                "Cache capacity set to {} bytes ({} in use)",
                max_bytes,
                state.budget.used()
            );
            state.budget.is_exceeded()
        };

        if exceeded {
            self.evictor.notify_one();
        }
    }

    // == Capacity Victim ==
    /// Returns the least recently used key while usage exceeds the budget,
    /// or `None` once it is within budget.
    ///
    /// The recency index is queried under the shared lock, so it reflects
    /// exactly the entries in the map.
    ///
    /// # Errors
    /// `InvariantViolation` when usage is over budget but the recency index
    /// is empty: the byte counter no longer matches the map.
    pub async fn capacity_victim(&self) -> Result<Option<String>> {
        let state = self.state.read().await;
        if !state.budget.is_exceeded() {
            return Ok(None);
        }

        match self.recency.peek_back().await? {
            Some(victim) => Ok(Some(victim)),
            None => Err(CacheError::InvariantViolation(format!(
                "{} bytes in use over a budget of {} with an empty recency index",
                state.budget.used(),
                state.budget.max()
            ))),
        }
    }

    #[cfg(test)]
    pub async fn is_over_budget(&self) -> bool {
        self.state.read().await.budget.is_exceeded()
    }

    pub async fn max_bytes(&self) -> u64 {
        self.state.read().await.budget.max()
    }

    pub async fn used_bytes(&self) -> u64 {
        self.state.read().await.budget.used()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn stats(&self) -> StatsSnapshot {
        let state = self.state.read().await;
        self.stats.snapshot(
            state.entries.len(),
            state.budget.used(),
            state.budget.max(),
        )
    }

    /// Sum of entry sizes as held in the map, for auditing the byte budget.
    #[cfg(test)]
    pub async fn audit(&self) -> (u64, u64) {
        let state = self.state.read().await;
        let summed = state.entries.values().map(|e| e.approx_size()).sum();
        (summed, state.budget.used())
    }

    #[cfg(test)]
    pub async fn keys(&self) -> Vec<String> {
        self.state.read().await.entries.keys().cloned().collect()
    }

    pub fn recency(&self) -> &RecencySender {
        &self.recency
    }

    pub fn expiry(&self) -> &ExpirySender {
        &self.expiry
    }

    // == Poisoning ==
    /// Marks the store unusable after an accounting invariant broke.
    pub fn poison(&self, reason: &str) {
        error!("Cache store poisoned: {}", reason);
        self.poisoned.store(true, Ordering::SeqCst);
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) async fn force_usage(&self, bytes: u64) {
        let mut state = self.state.write().await;
        let used = state.budget.used();
        state.budget.release(used);
        state.budget.charge(bytes);
    }
}
