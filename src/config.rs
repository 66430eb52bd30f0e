//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

use crate::cache::ByteSize;

/// Default queue depth of the recency actor
pub const DEFAULT_RECENCY_QUEUE: usize = 10_000;

/// Default queue depth of the expiry monitor
pub const DEFAULT_EXPIRY_QUEUE: usize = 1_000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum aggregate byte size of all cached responses
    pub max_cache_size: ByteSize,
    /// Bounded command queue depth for the recency actor
    pub recency_queue_capacity: usize,
    /// Bounded command queue depth for the expiry monitor
    pub expiry_queue_capacity: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Byte budget such as `512MB` (default: 1GB)
    /// - `CACHE_RECENCY_QUEUE` - Recency command queue depth (default: 10000)
    /// - `CACHE_EXPIRY_QUEUE` - Expiry command queue depth (default: 1000)
    pub fn from_env() -> Self {
        Self {
            max_cache_size: env::var("CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ByteSize::GB),
            recency_queue_capacity: env::var("CACHE_RECENCY_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_RECENCY_QUEUE),
            expiry_queue_capacity: env::var("CACHE_EXPIRY_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_EXPIRY_QUEUE),
        }
    }

    /// Same defaults with a different byte budget.
    pub fn with_max_size(max_cache_size: ByteSize) -> Self {
        Self {
            max_cache_size,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_size: ByteSize::GB,
            recency_queue_capacity: DEFAULT_RECENCY_QUEUE,
            expiry_queue_capacity: DEFAULT_EXPIRY_QUEUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_cache_size, ByteSize::GB);
        assert_eq!(config.recency_queue_capacity, 10_000);
        assert_eq!(config.expiry_queue_capacity, 1_000);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the env so parallel tests don't race on it
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_RECENCY_QUEUE");
        env::remove_var("CACHE_EXPIRY_QUEUE");

        let config = Config::from_env();
        assert_eq!(config.max_cache_size, ByteSize::GB);
        assert_eq!(config.recency_queue_capacity, 10_000);
        assert_eq!(config.expiry_queue_capacity, 1_000);

        env::set_var("CACHE_MAX_SIZE", "64MB");
        env::set_var("CACHE_RECENCY_QUEUE", "0");
        env::set_var("CACHE_EXPIRY_QUEUE", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.max_cache_size, ByteSize::mb(64));
        assert_eq!(config.recency_queue_capacity, 10_000);
        assert_eq!(config.expiry_queue_capacity, 1_000);

        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_RECENCY_QUEUE");
        env::remove_var("CACHE_EXPIRY_QUEUE");
    }

    #[test]
    fn test_config_with_max_size() {
        let config = Config::with_max_size(ByteSize::kb(8));
        assert_eq!(config.max_cache_size, ByteSize::kb(8));
        assert_eq!(config.recency_queue_capacity, DEFAULT_RECENCY_QUEUE);
    }
}
