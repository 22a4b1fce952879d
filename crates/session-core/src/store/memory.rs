//! In-process store backend
//!
//! Each call takes the lock once, so individual commands are serialized the
//! same way a single Redis server serializes them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EphemeralStore, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    lists: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.values.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.values.write().await.remove(key).is_some())
    }

    async fn push(&self, list: &str, value: &str) -> StoreResult<usize> {
        let mut lists = self.lists.write().await;
        let entries = lists.entry(list.to_string()).or_default();
        entries.push_front(value.to_string());
        Ok(entries.len())
    }

    async fn range(&self, list: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .lists
            .read()
            .await
            .get(list)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, list: &str, value: &str, count: usize) -> StoreResult<usize> {
        let mut lists = self.lists.write().await;
        let Some(entries) = lists.get_mut(list) else {
            return Ok(0);
        };

        let mut removed = 0;
        entries.retain(|entry| {
            if removed < count && entry == value {
                removed += 1;
                false
            } else {
                true
            }
        });

        // Redis drops empty lists
        if entries.is_empty() {
            lists.remove(list);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("a@x.com", "t1").await.unwrap();
        store.set("a@x.com", "t2").await.unwrap();

        assert_eq!(store.get("a@x.com").await.unwrap().as_deref(), Some("t2"));
        assert!(store.exists("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        assert!(!store.delete("missing").await.unwrap());

        store.set("k", "v").await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_push_prepends_and_counts() {
        let store = MemoryStore::new();
        assert_eq!(store.push("q", "a").await.unwrap(), 1);
        assert_eq!(store.push("q", "b").await.unwrap(), 2);

        assert_eq!(store.range("q").await.unwrap(), vec!["b", "a"]);
        // range is not destructive
        assert_eq!(store.range("q").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_is_capped() {
        let store = MemoryStore::new();
        for value in ["a", "b", "a", "a"] {
            store.push("q", value).await.unwrap();
        }

        assert_eq!(store.remove("q", "a", 2).await.unwrap(), 2);
        assert_eq!(store.range("q").await.unwrap(), vec!["b", "a"]);

        assert_eq!(store.remove("q", "zzz", 10).await.unwrap(), 0);
        assert_eq!(store.remove("missing", "a", 10).await.unwrap(), 0);
    }
}
