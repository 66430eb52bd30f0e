//! Size Evictor Task
//!
//! Background task that brings byte usage back under budget by evicting
//! least recently used keys.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{CacheStore, EvictionReason};
use crate::error::{CacheError, Result};

/// Spawns the size evictor.
///
/// Each wake-up runs one eviction pass. Signals that arrive while a pass is
/// running collapse into a single follow-up pass.
///
/// # Arguments
/// * `store` - Store to evict from
/// * `signal` - Notified by the store whenever usage exceeds the budget
pub fn spawn_size_evictor(store: Arc<CacheStore>, signal: Arc<Notify>) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Size evictor started");

        loop {
            signal.notified().await;

            match evict_to_budget(&store).await {
                Ok(0) => debug!("Size evictor: already within budget"),
                Ok(evicted) => info!("Size evictor: evicted {} entries", evicted),
                Err(err @ CacheError::InvariantViolation(_)) => {
                    store.poison(&err.to_string());
                    error!("Size evictor stopped: {}", err);
                    break;
                }
                Err(err) => {
                    error!("Size evictor stopped: {}", err);
                    break;
                }
            }
        }
    })
}

// == Eviction Pass ==
/// Evicts least recently used keys until usage is within budget.
///
/// Returns the number of entries evicted.
///
/// # Errors
/// `InvariantViolation` when usage is over budget but the recency index is
/// empty: the byte counter no longer matches the map.
pub async fn evict_to_budget(store: &CacheStore) -> Result<usize> {
    let mut evicted = 0;

    while let Some(victim) = store.capacity_victim().await? {
        if store.evict(&victim, EvictionReason::Capacity).await {
            evicted += 1;
        }
    }

    Ok(evicted)
}
