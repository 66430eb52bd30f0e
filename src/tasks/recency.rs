//! Recency Actor
//!
//! Single task owning the [`RecencyList`]. Every mutation arrives as a
//! command on a bounded queue and is applied in arrival order, so the list
//! needs no lock of its own.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::cache::{RecencyHandle, RecencyList};
use crate::error::{CacheError, Result};

/// Commands understood by the recency actor.
#[derive(Debug)]
pub enum RecencyCommand {
    MoveToFront(RecencyHandle),
    PushFront { handle: RecencyHandle, key: String },
    Remove(RecencyHandle),
    PeekBack(oneshot::Sender<Option<String>>),
    Snapshot(oneshot::Sender<Vec<String>>),
}

// == Recency Sender ==
/// Producer side of the recency actor's queue.
///
/// Sends wait for queue space rather than dropping a command.
#[derive(Debug, Clone)]
pub struct RecencySender {
    tx: mpsc::Sender<RecencyCommand>,
}

impl RecencySender {
    pub async fn move_to_front(&self, handle: RecencyHandle) -> Result<()> {
        self.send(RecencyCommand::MoveToFront(handle)).await
    }

    pub async fn push_front(&self, handle: RecencyHandle, key: String) -> Result<()> {
        self.send(RecencyCommand::PushFront { handle, key }).await
    }

    pub async fn remove(&self, handle: RecencyHandle) -> Result<()> {
        self.send(RecencyCommand::Remove(handle)).await
    }

    /// Least recently used key, after every earlier command has applied.
    pub async fn peek_back(&self) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(RecencyCommand::PeekBack(reply)).await?;
        rx.await.map_err(|_| CacheError::ActorStopped("recency"))
    }

    /// Keys from most to least recently used.
    pub async fn snapshot(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(RecencyCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| CacheError::ActorStopped("recency"))
    }

    async fn send(&self, command: RecencyCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CacheError::ActorStopped("recency"))
    }
}

/// Creates the bounded queue feeding the recency actor.
pub fn recency_channel(capacity: usize) -> (RecencySender, mpsc::Receiver<RecencyCommand>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RecencySender { tx }, rx)
}

/// Spawns the recency actor. It runs until every sender is dropped.
pub fn spawn_recency_actor(mut commands: mpsc::Receiver<RecencyCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Recency actor started");
        let mut list = RecencyList::new();

        while let Some(command) = commands.recv().await {
            apply(&mut list, command);
        }

        debug!("Recency actor stopped: queue closed");
    })
}

fn apply(list: &mut RecencyList, command: RecencyCommand) {
    match command {
        RecencyCommand::MoveToFront(handle) => {
            if !list.move_to_front(handle) {
                trace!("Recency move for stale handle {:?}", handle);
            }
        }
        RecencyCommand::PushFront { handle, key } => list.push_front(handle, key),
        RecencyCommand::Remove(handle) => {
            list.remove(handle);
        }
        RecencyCommand::PeekBack(reply) => {
            // Requester may have given up; nothing to do then
            let _ = reply.send(list.back().map(str::to_owned));
        }
        RecencyCommand::Snapshot(reply) => {
            let _ = reply.send(list.iter().map(|(_, key)| key.to_owned()).collect());
        }
    }
}
