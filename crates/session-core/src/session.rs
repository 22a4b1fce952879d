//! Single-session-per-address store
//!
//! One entry per address holding the currently valid token string. A new
//! login or refresh replaces it wholesale. Entries carry no TTL: they live
//! until logout deletes them, even after the token inside has expired.

use std::sync::Arc;

use tracing::debug;

use crate::store::{EphemeralStore, StoreResult};

/// One live token per address, kept in the ephemeral store without a TTL.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn EphemeralStore>,
    prefix: String,
}

impl SessionStore {
    /// `prefix` is prepended to every address to form the store key; an
    /// empty prefix keys sessions by the bare address.
    pub fn new(store: Arc<dyn EphemeralStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, address: &str) -> String {
        format!("{}{}", self.prefix, address)
    }

    /// Store `token` as the live session for `address`, replacing any other.
    pub async fn put(&self, address: &str, token: &str) -> StoreResult<()> {
        self.store.set(&self.key(address), token).await?;
        debug!(address, "Session stored");
        Ok(())
    }

    /// Fetch the stored token for `address`
    ///
    /// # Arguments
    /// * `address` - Address whose session to read
    ///
    /// # Returns
    /// * `Ok(Some(token))` - The live session token
    /// * `Ok(None)` - No session is stored
    /// * `Err(StoreError)` - The store could not be read
    pub async fn get(&self, address: &str) -> StoreResult<Option<String>> {
        self.store.get(&self.key(address)).await
    }

    /// True when a session is stored for `address`. This is the second
    /// stage of the session gate.
    pub async fn exists(&self, address: &str) -> StoreResult<bool> {
        self.store.exists(&self.key(address)).await
    }

    /// Returns true iff a session existed and was removed.
    pub async fn remove(&self, address: &str) -> StoreResult<bool> {
        let removed = self.store.delete(&self.key(address)).await?;
        debug!(address, removed, "Session removed");
        Ok(removed)
    }
}
