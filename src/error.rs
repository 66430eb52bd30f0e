//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// A cache miss is not an error; lookups report it as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is empty or could not be normalized
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Freshness metadata cannot be honored
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A single entry is larger than the whole byte budget
    #[error("Entry of {size} bytes exceeds cache capacity of {max} bytes")]
    EntryTooLarge { size: u64, max: u64 },

    /// Byte accounting drifted from the indexed entries
    #[error("Cache invariant violated: {0}")]
    InvariantViolation(String),

    /// A background task is gone and its queue is closed
    #[error("Background {0} task has stopped")]
    ActorStopped(&'static str),

    /// Configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::EntryTooLarge { size: 2048, max: 1024 };
        assert_eq!(
            err.to_string(),
            "Entry of 2048 bytes exceeds cache capacity of 1024 bytes"
        );

        let err = CacheError::ActorStopped("recency");
        assert_eq!(err.to_string(), "Background recency task has stopped");
    }
}
