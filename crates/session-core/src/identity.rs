//! Identity records and the repository capability
//!
//! Durable storage of identities belongs to another service; the core only
//! needs lookup by address and creation. `MemoryIdentityRepository` backs
//! tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::RepositoryError;

/// A registered identity.
///
/// `credential_hash` is whatever the configured hasher produced; it is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    pub created_at: DateTime<Utc>,
    /// Set when the identity was soft-deleted; such identities cannot log in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(address: String, credential_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            address,
            credential_hash,
            full_name: None,
            age: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Registration input. `credential` is plaintext and is hashed before it
/// goes anywhere; `Debug` never prints it.
#[derive(Clone, Deserialize)]
pub struct NewIdentity {
    pub address: String,
    pub credential: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("address", &self.address)
            .field("credential", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("age", &self.age)
            .finish()
    }
}

/// Lookup and creation of identities, owned by an external service.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Find the identity registered under `address`, soft-deleted or not.
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, RepositoryError>;

    /// Persist a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateAddress`] if the address is taken.
    async fn create(&self, identity: Identity) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityRepository {
    by_address: Arc<RwLock<HashMap<String, Identity>>>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.by_address.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, RepositoryError> {
        Ok(self.by_address.read().await.get(address).cloned())
    }

    async fn create(&self, identity: Identity) -> Result<(), RepositoryError> {
        let mut by_address = self.by_address.write().await;
        if by_address.contains_key(&identity.address) {
            return Err(RepositoryError::DuplicateAddress(identity.address));
        }
        by_address.insert(identity.address.clone(), identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemoryIdentityRepository::new();
        let identity = Identity::new("a@x.com".into(), "hash".into());
        let id = identity.id.clone();

        repo.create(identity).await.unwrap();

        let found = repo.find_by_address("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(repo.find_by_address("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_address_rejected() {
        let repo = MemoryIdentityRepository::new();
        repo.create(Identity::new("a@x.com".into(), "h1".into()))
            .await
            .unwrap();

        let err = repo
            .create(Identity::new("a@x.com".into(), "h2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateAddress(a) if a == "a@x.com"));
        assert_eq!(repo.len().await, 1);
    }

    #[test]
    fn test_new_identity_debug_hides_credential() {
        let new_identity = NewIdentity {
            address: "a@x.com".into(),
            credential: "hunter2".into(),
            full_name: None,
            age: None,
        };

        let debug = format!("{:?}", new_identity);
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_hash_is_not_serialized() {
        let identity = Identity::new("a@x.com".into(), "$argon2id$secret".into());
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("argon2id"));
    }
}
