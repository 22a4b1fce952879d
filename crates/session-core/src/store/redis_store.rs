//! Redis store backend

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use super::{EphemeralStore, StoreResult};

/// Store backed by a single multiplexed Redis connection.
///
/// `ConnectionManager` reconnects on its own; a command issued while the
/// link is down fails with [`StoreError::Unavailable`](crate::error::StoreError::Unavailable).
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let count: usize = conn.exists(key).await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let count: usize = conn.del(key).await?;
        Ok(count > 0)
    }

    async fn push(&self, list: &str, value: &str) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        Ok(conn.lpush(list, value).await?)
    }

    async fn range(&self, list: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(list, 0, -1).await?)
    }

    async fn remove(&self, list: &str, value: &str, count: usize) -> StoreResult<usize> {
        // LREM with count 0 means "all occurrences"
        if count == 0 {
            return Ok(0);
        }
        let count = isize::try_from(count).unwrap_or(isize::MAX);
        let mut conn = self.conn.clone();
        Ok(conn.lrem(list, count, value).await?)
    }
}
