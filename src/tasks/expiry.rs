//! TTL Monitor Task
//!
//! Single task owning the [`ExpiryIndex`]. It sleeps until the earliest
//! deadline, waking early whenever a command arrives, and hands every expired
//! key back to the store for eviction.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::cache::{CacheStore, ExpiryHandle, ExpiryIndex};
use crate::error::{CacheError, Result};

/// Commands understood by the TTL monitor.
#[derive(Debug)]
pub enum ExpiryCommand {
    Insert {
        handle: ExpiryHandle,
        key: String,
        deadline: Instant,
    },
    Remove(ExpiryHandle),
    Snapshot(oneshot::Sender<Vec<(ExpiryHandle, String)>>),
}

// == Expiry Sender ==
/// Producer side of the TTL monitor's queue.
#[derive(Debug, Clone)]
pub struct ExpirySender {
    tx: mpsc::Sender<ExpiryCommand>,
}

impl ExpirySender {
    pub async fn insert(&self, handle: ExpiryHandle, key: String, deadline: Instant) -> Result<()> {
        self.send(ExpiryCommand::Insert {
            handle,
            key,
            deadline,
        })
        .await
    }

    pub async fn remove(&self, handle: ExpiryHandle) -> Result<()> {
        self.send(ExpiryCommand::Remove(handle)).await
    }

    /// Tracked entries in deadline order.
    pub async fn snapshot(&self) -> Result<Vec<(ExpiryHandle, String)>> {
        let (reply, rx) = oneshot::channel();
        self.send(ExpiryCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| CacheError::ActorStopped("expiry"))
    }

    async fn send(&self, command: ExpiryCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CacheError::ActorStopped("expiry"))
    }
}

/// Creates the bounded queue feeding the TTL monitor.
pub fn expiry_channel(capacity: usize) -> (ExpirySender, mpsc::Receiver<ExpiryCommand>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ExpirySender { tx }, rx)
}

/// Spawns the TTL monitor for `store`.
///
/// # Arguments
/// * `store` - Store that expired keys are evicted from
/// * `commands` - Receiving end of [`expiry_channel`]
///
/// # Returns
/// A JoinHandle for the spawned task, aborted when the cache is dropped.
pub fn spawn_expiry_monitor(
    store: Arc<CacheStore>,
    mut commands: mpsc::Receiver<ExpiryCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("TTL monitor started");
        let mut index = ExpiryIndex::new();

        loop {
            let expired = index.pop_expired(Instant::now());
            if !expired.is_empty() {
                debug!("TTL monitor: {} entries expired", expired.len());
                // Store writers can be blocked on this queue while holding the
                // map lock, so the eviction must not run on this task.
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.evict_expired(expired).await;
                });
            }

            let next = index.next_deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => apply(&mut index, command),
                    None => break,
                },
                _ = sleep_until(next) => trace!("TTL monitor woke on deadline"),
            }
        }

        debug!("TTL monitor stopped: queue closed");
    })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn apply(index: &mut ExpiryIndex, command: ExpiryCommand) {
    match command {
        ExpiryCommand::Insert {
            handle,
            key,
            deadline,
        } => index.insert(handle, key, deadline),
        ExpiryCommand::Remove(handle) => {
            if index.remove(handle).is_none() {
                trace!("Expiry removal for handle {:?} already reaped", handle);
            }
        }
        ExpiryCommand::Snapshot(reply) => {
            let _ = reply.send(index.entries());
        }
    }
}
