//! Ephemeral key/value store capability
//!
//! Sessions and the notification queue both live in one shared store. The
//! trait mirrors the handful of Redis commands the components need; every
//! method is a single command, and nothing here is transactional across
//! calls.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EphemeralStore: Send + Sync + 'static {
    /// Overwrite `key` with `value`. No expiry is attached.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Delete `key`. Returns true iff it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Prepend `value` to the list at `list`. Returns the new length.
    async fn push(&self, list: &str, value: &str) -> StoreResult<usize>;

    /// Read the whole list without consuming it.
    async fn range(&self, list: &str) -> StoreResult<Vec<String>>;

    /// Remove up to `count` occurrences of `value`, head first.
    /// Returns the number actually removed.
    async fn remove(&self, list: &str, value: &str, count: usize) -> StoreResult<usize>;
}
