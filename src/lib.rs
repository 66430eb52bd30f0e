//! Resource Cache - An in-process HTTP response cache
//!
//! Caches responses by normalized request URL, evicting least recently used
//! entries to stay within a byte budget and reaping entries at their expiry.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{
    normalize_key, ByteSize, CachedEntry, FreshnessMetadata, ResponseCache, ResponsePayload,
    StatsSnapshot,
};
pub use config::Config;
pub use error::{CacheError, Result};
