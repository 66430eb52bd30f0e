//! Byte Budget Module
//!
//! Plain accounting of byte usage against the configured maximum. Always
//! mutated under the store's exclusive lock.

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBudget {
    max: u64,
    used: u64,
}

impl ByteBudget {
    pub fn new(max: u64) -> Self {
        Self { max, used: 0 }
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn set_max(&mut self, max: u64) {
        self.max = max;
    }

    pub fn charge(&mut self, bytes: u64) {
        self.used = self.used.saturating_add(bytes);
    }

    /// Releases `bytes`. Releasing more than is charged clamps at zero; the
    /// size evictor reports the resulting drift.
    pub fn release(&mut self, bytes: u64) {
        if bytes > self.used {
            warn!(
                "Byte budget underflow: releasing {} bytes with {} in use",
                bytes, self.used
            );
        }
        self.used = self.used.saturating_sub(bytes);
    }

    /// True when usage is strictly above the maximum.
    pub fn is_exceeded(&self) -> bool {
        self.used > self.max
    }
}
