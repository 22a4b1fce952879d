//! Pending-notification queue
//!
//! A list in the shared store treated as a multiset: registration appends,
//! the dispatcher snapshots the whole thing and later removes by value.
//! Nothing is deduplicated, so the same address can be queued twice.

use std::sync::Arc;

use crate::store::{EphemeralStore, StoreResult};

/// Default list key, kept from the deployed system.
pub const DEFAULT_QUEUE_KEY: &str = "email_queue";

#[derive(Clone)]
pub struct NotificationQueue {
    store: Arc<dyn EphemeralStore>,
    key: String,
}

impl NotificationQueue {
    pub fn new(store: Arc<dyn EphemeralStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Append `address`. Returns the queue length after the append.
    pub async fn enqueue(&self, address: &str) -> StoreResult<usize> {
        self.store.push(&self.key, address).await
    }

    /// Read every pending entry without removing anything.
    pub async fn snapshot(&self) -> StoreResult<Vec<String>> {
        self.store.range(&self.key).await
    }

    /// Remove up to `count` entries equal to `address`.
    pub async fn remove(&self, address: &str, count: usize) -> StoreResult<usize> {
        self.store.remove(&self.key, address, count).await
    }

    /// Number of pending entries, duplicates included.
    pub async fn len(&self) -> StoreResult<usize> {
        Ok(self.snapshot().await?.len())
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}
