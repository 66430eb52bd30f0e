//! Expiry Index Module
//!
//! Orders TTL-bearing entries by absolute deadline.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::cache::skiplist::SkipList;
use crate::cache::ExpiryHandle;

/// Skip list key: deadline first, then the handle so that ties keep
/// insertion order.
type ExpiryKey = (Instant, ExpiryHandle);

// == Expiry Index ==
/// Deadline-ordered index of keys, addressed by [`ExpiryHandle`].
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    list: SkipList<ExpiryKey, String>,
    deadlines: HashMap<ExpiryHandle, Instant>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `key` until `deadline`. Re-inserting a handle replaces it.
    pub fn insert(&mut self, handle: ExpiryHandle, key: String, deadline: Instant) {
        self.remove(handle);
        self.deadlines.insert(handle, deadline);
        self.list.insert((deadline, handle), key);
    }

    /// Stops tracking a handle. Returns its key if it was present.
    pub fn remove(&mut self, handle: ExpiryHandle) -> Option<String> {
        let deadline = self.deadlines.remove(&handle)?;
        self.list.remove(&(deadline, handle))
    }

    /// Earliest deadline, if any entry is tracked.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.list.first().map(|((deadline, _), _)| *deadline)
    }

    // == Pop Expired ==
    /// Removes every entry whose deadline is at or before `now`, earliest first.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<(String, ExpiryHandle)> {
        let mut expired = Vec::new();
        while let Some(((deadline, handle), _)) = self.list.first() {
            if *deadline > now {
                break;
            }
            let handle = *handle;
            if let Some(key) = self.list.pop_first() {
                self.deadlines.remove(&handle);
                expired.push((key, handle));
            }
        }
        expired
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Tracked entries in deadline order.
    pub fn entries(&self) -> Vec<(ExpiryHandle, String)> {
        self.list
            .iter()
            .map(|((_, handle), key)| (*handle, key.clone()))
            .collect()
    }
}
