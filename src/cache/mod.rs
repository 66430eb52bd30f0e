//! Cache Module
//!
//! In-memory response caching with byte-bounded LRU eviction and TTL expiry.

mod budget;
mod entry;
mod expiry;
mod key;
mod recency;
mod response_cache;
mod size;
mod skiplist;
mod stats;
mod store;


// Re-export public types
pub use entry::{estimate_size, CachedEntry, FreshnessMetadata, HitState, ResponsePayload};
pub use key::normalize_key;
pub use response_cache::ResponseCache;
pub use size::ByteSize;
pub use stats::{EvictionReason, StatsSnapshot};

pub(crate) use budget::ByteBudget;
pub(crate) use entry::{ExpiryHandle, RecencyHandle};
pub(crate) use expiry::ExpiryIndex;
pub(crate) use recency::RecencyList;
pub(crate) use stats::CacheStats;
pub(crate) use store::CacheStore;
