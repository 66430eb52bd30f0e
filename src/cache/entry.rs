//! Cache Entry Module
//!
//! Defines the cached response record, its freshness metadata and the
//! handles tying it to the recency and expiry indexes.

use std::borrow::Cow;
use std::mem::size_of;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::error::{CacheError, Result};

// == Handles ==
/// Ticket identifying an entry's node in the recency index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecencyHandle(pub(crate) u64);

/// Ticket identifying an entry's node in the expiry index.
///
/// Tickets grow monotonically, so ordering by `(deadline, handle)` keeps
/// entries with equal deadlines in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryHandle(pub(crate) u64);

// == Response Payload ==
/// Response body plus the protocol metadata the cache keeps with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    /// Numeric status code
    pub status: u16,
    /// Status line, e.g. `200 OK`
    pub status_line: String,
    /// Protocol version string, e.g. `HTTP/1.1`
    pub protocol: String,
    /// Raw response body
    pub body: Bytes,
}

impl ResponsePayload {
    /// Creates a `200 OK` HTTP/1.1 payload around `body`.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            status_line: "200 OK".to_string(),
            protocol: "HTTP/1.1".to_string(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16, status_line: impl Into<String>) -> Self {
        self.status = status;
        self.status_line = status_line.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }
}

// == Freshness Metadata ==
/// Freshness fields passed through to callers; only `expires_at` drives eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessMetadata {
    /// Absolute expiry; `None` means the entry is only size-evicted
    pub expires_at: Option<DateTime<Utc>>,
    /// Last-Modified value of the response
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag value of the response
    pub etag: Option<String>,
}

impl FreshnessMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `expires_at` to now plus `ttl`. A TTL too large to represent
    /// leaves the entry without expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    // == Deadline ==
    /// Converts `expires_at` into a monotonic deadline.
    ///
    /// # Errors
    /// `InvalidMetadata` when `expires_at` is already in the past.
    pub(crate) fn deadline(&self) -> Result<Option<Instant>> {
        let Some(expires_at) = self.expires_at else {
            return Ok(None);
        };

        let remaining = (expires_at - Utc::now()).to_std().map_err(|_| {
            CacheError::InvalidMetadata(format!("expires_at {} is in the past", expires_at))
        })?;

        Ok(Instant::now().checked_add(remaining))
    }
}

// == Hit State ==
/// Whether a response was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HitState {
    Unset = 0,
    Fresh = 1,
    Cached = 2,
}

impl HitState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => HitState::Fresh,
            2 => HitState::Cached,
            _ => HitState::Unset,
        }
    }
}

// == Size Estimation ==
/// Approximate bytes an entry holds.
///
/// Structural overhead of the record plus the lengths of its variable parts.
/// Deterministic, and grows with the body length.
pub fn estimate_size(key: &str, payload: &ResponsePayload, metadata: &FreshnessMetadata) -> u64 {
    let variable = key.len()
        + payload.body.len()
        + payload.status_line.len()
        + payload.protocol.len()
        + metadata.etag.as_ref().map_or(0, String::len);

    (size_of::<CachedEntry>() + variable) as u64
}

// == Cached Entry ==
/// An immutable cached response with its eviction metadata.
#[derive(Debug)]
pub struct CachedEntry {
    key: String,
    payload: ResponsePayload,
    recency_handle: RecencyHandle,
    expiry_handle: Option<ExpiryHandle>,
    expires_at: Option<DateTime<Utc>>,
    deadline: Option<Instant>,
    last_modified: Option<DateTime<Utc>>,
    etag: Option<String>,
    approx_size: u64,
    hit: AtomicU8,
}

impl CachedEntry {
    // == Constructor ==
    /// Builds the entry for ticket `ticket`. Only the store creates entries.
    pub(crate) fn new(
        key: String,
        payload: ResponsePayload,
        metadata: FreshnessMetadata,
        ticket: u64,
        deadline: Option<Instant>,
    ) -> Self {
        let approx_size = estimate_size(&key, &payload, &metadata);

        Self {
            key,
            payload,
            recency_handle: RecencyHandle(ticket),
            expiry_handle: deadline.map(|_| ExpiryHandle(ticket)),
            expires_at: metadata.expires_at,
            deadline,
            last_modified: metadata.last_modified,
            etag: metadata.etag,
            approx_size,
            hit: AtomicU8::new(HitState::Unset as u8),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &ResponsePayload {
        &self.payload
    }

    /// Response body as bytes.
    pub fn body(&self) -> &Bytes {
        &self.payload.body
    }

    /// Response body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload.body)
    }

    pub fn status(&self) -> u16 {
        self.payload.status
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn approx_size(&self) -> u64 {
        self.approx_size
    }

    pub(crate) fn recency_handle(&self) -> RecencyHandle {
        self.recency_handle
    }

    pub(crate) fn expiry_handle(&self) -> Option<ExpiryHandle> {
        self.expiry_handle
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    // == Is Expired ==
    /// Checks if the entry's deadline has passed.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline. Entries without a deadline never expire.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Remaining time to live; `Some(ZERO)` once expired, `None` without TTL.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    // == Hit Tracking ==
    /// `None` until set, then whether the entry was served from the cache.
    pub fn was_cache_hit(&self) -> Option<bool> {
        match HitState::from_u8(self.hit.load(Ordering::Acquire)) {
            HitState::Unset => None,
            HitState::Fresh => Some(false),
            HitState::Cached => Some(true),
        }
    }

    /// True only when the entry was served from the cache.
    pub fn cache_hit(&self) -> bool {
        self.was_cache_hit() == Some(true)
    }

    /// Marks the entry as the response a caller fetched and stored.
    /// Returns false if the state was already set.
    pub(crate) fn mark_fresh(&self) -> bool {
        self.hit
            .compare_exchange(
                HitState::Unset as u8,
                HitState::Fresh as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Marks the entry as served from the cache. `Cached` is terminal; a
    /// fresh entry is upgraded on its first hit. Returns false if already set.
    pub(crate) fn mark_hit(&self) -> bool {
        self.hit.swap(HitState::Cached as u8, Ordering::AcqRel) != HitState::Cached as u8
    }
}
