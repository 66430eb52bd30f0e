//! Background Tasks Module
//!
//! The three tasks that run beside a cache.
//!
//! # Tasks
//! - Recency actor: owns the LRU order, fed by a bounded command queue
//! - TTL monitor: owns the expiry index and reaps entries at their deadline
//! - Size evictor: evicts least recently used entries while over budget

mod evictor;
mod expiry;
mod recency;

pub use evictor::spawn_size_evictor;
pub use expiry::{expiry_channel, spawn_expiry_monitor, ExpirySender};
pub use recency::{recency_channel, spawn_recency_actor, RecencySender};

#[cfg(test)]
pub use expiry::ExpiryCommand;
