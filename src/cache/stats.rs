//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Eviction Reason ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Deadline passed
    Expired,
    /// Least recently used while over budget
    Capacity,
    /// Explicitly invalidated by a caller
    Invalidated,
    /// Overwritten by a newer entry for the same key
    Replaced,
}

// == Cache Stats ==
/// Lock-free performance counters, updated from shared and exclusive paths.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    capacity_evictions: AtomicU64,
    invalidations: AtomicU64,
    replacements: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    /// Increments the counter matching `reason`.
    pub fn record_eviction(&self, reason: EvictionReason) {
        let counter = match reason {
            EvictionReason::Expired => &self.expirations,
            EvictionReason::Capacity => &self.capacity_evictions,
            EvictionReason::Invalidated => &self.invalidations,
            EvictionReason::Replaced => &self.replacements,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters alongside the current occupancy.
    pub fn snapshot(&self, total_entries: usize, used_bytes: u64, max_bytes: u64) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            capacity_evictions: self.capacity_evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            total_entries,
            used_bytes,
            max_bytes,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of the cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry)
    pub misses: u64,
    /// Entries removed by the TTL monitor
    pub expirations: u64,
    /// Entries removed to get back under the byte budget
    pub capacity_evictions: u64,
    /// Entries removed by `invalidate`
    pub invalidations: u64,
    /// Entries overwritten by a store on the same key
    pub replacements: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current byte usage
    pub used_bytes: u64,
    /// Configured byte budget
    pub max_bytes: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
