//! Auth flow coordinator
//!
//! Login, registration, refresh and logout over the session store, the token
//! issuer and the external identity repository. Every operation returns a
//! `Result<_, AuthError>`; backend faults are folded into
//! [`AuthError::Unexpected`] and logged here with their cause, so callers
//! only ever handle a well-formed failure.
//!
//! Per address the session is either absent or holds exactly one token:
//!
//! ```text
//! NoSession --login/refresh--> ActiveSession(t)
//! ActiveSession(t) --login/refresh--> ActiveSession(t')
//! ActiveSession(t) --logout--> NoSession
//! NoSession --logout--> NoSession   (reported as NoActiveSession)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::AuthError;
use crate::identity::{Identity, IdentityRepository, NewIdentity};
use crate::password::CredentialHasher;
use crate::queue::NotificationQueue;
use crate::session::SessionStore;
use crate::token::TokenIssuer;

/// Session state of one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    ActiveSession(String),
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub identity_id: String,
    /// Queue length right after the confirmation was queued
    pub queued: usize,
}

/// Login, registration, refresh and logout over one shared store.
///
/// Every operation turns internal faults into [`AuthError`] values and logs
/// the cause; callers never see raw backend errors.
pub struct AuthCoordinator {
    issuer: TokenIssuer,
    sessions: SessionStore,
    queue: NotificationQueue,
    identities: Arc<dyn IdentityRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AuthCoordinator {
    /// Create a coordinator from its collaborators
    ///
    /// # Arguments
    /// * `issuer` - Signs the tokens handed out by login and refresh
    /// * `sessions` - Holds the one live token per address
    /// * `queue` - Receives the confirmation entry on registration
    /// * `identities` - Looks up and creates identities
    /// * `hasher` - Hashes and compares credentials
    pub fn new(
        issuer: TokenIssuer,
        sessions: SessionStore,
        queue: NotificationQueue,
        identities: Arc<dyn IdentityRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            issuer,
            sessions,
            queue,
            identities,
            hasher,
        }
    }

    /// Issuer shared with the session gate.
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Check the credential and open a session, replacing any existing one.
    ///
    /// # Arguments
    /// * `address` - Address the identity is registered under
    /// * `credential` - Plaintext credential to compare against the stored hash
    ///
    /// # Returns
    /// The freshly issued token, which is now the stored session
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` - Unknown address, soft-deleted
    ///   identity or wrong credential; the session store is not touched
    /// - `AuthError::Unexpected` - Store, repository, hashing or signing fault
    #[instrument(skip(self, credential))]
    pub async fn login(&self, address: &str, credential: &str) -> Result<String, AuthError> {
        let result = self.try_login(address, credential).await;
        report("login", &result);
        result
    }

    async fn try_login(&self, address: &str, credential: &str) -> Result<String, AuthError> {
        // Unknown, soft-deleted and wrong-credential look the same to the caller
        let Some(identity) = self
            .identities
            .find_by_address(address)
            .await?
            .filter(|identity| !identity.is_deleted())
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_credential(credential, &identity.credential_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(&identity.id, &identity.address).await
    }

    /// Persist a new identity and queue its confirmation email.
    ///
    /// The identity is not rolled back if queueing fails; the call still
    /// reports a generic failure in that case.
    #[instrument(skip(self, new_identity), fields(address = %new_identity.address))]
    pub async fn register(&self, new_identity: NewIdentity) -> Result<Registered, AuthError> {
        let result = self.try_register(new_identity).await;
        report("register", &result);
        result
    }

    async fn try_register(&self, new_identity: NewIdentity) -> Result<Registered, AuthError> {
        let NewIdentity {
            address,
            credential,
            full_name,
            age,
        } = new_identity;

        let credential_hash = self.hash_credential(credential).await?;

        let mut identity = Identity::new(address, credential_hash);
        identity.full_name = full_name;
        identity.age = age;
        let identity_id = identity.id.clone();
        let address = identity.address.clone();

        self.identities.create(identity).await?;

        let queued = self.queue.enqueue(&address).await.map_err(|e| {
            warn!(error = %e, "Identity persisted but confirmation was not queued");
            AuthError::from(e)
        })?;

        Ok(Registered {
            identity_id,
            queued,
        })
    }

    /// Issue a fresh token and overwrite the session, whatever its state.
    ///
    /// Does not look at the caller's current token; the session gate in
    /// front of this call is responsible for that.
    #[instrument(skip(self))]
    pub async fn refresh(&self, identity_id: &str, address: &str) -> Result<String, AuthError> {
        let result = self.open_session(identity_id, address).await;
        report("refresh", &result);
        result
    }

    /// Close the session for `address`.
    #[instrument(skip(self))]
    pub async fn logout(&self, address: &str) -> Result<(), AuthError> {
        let result = self.try_logout(address).await;
        report("logout", &result);
        result
    }

    async fn try_logout(&self, address: &str) -> Result<(), AuthError> {
        if !self.sessions.exists(address).await? {
            return Err(AuthError::NoActiveSession);
        }

        // A concurrent logout may win between the check and the delete;
        // the session is gone either way
        self.sessions.remove(address).await?;
        Ok(())
    }

    /// Report whether `address` currently holds a session, and its token.
    pub async fn session_state(&self, address: &str) -> Result<SessionState, AuthError> {
        Ok(match self.sessions.get(address).await? {
            Some(token) => SessionState::ActiveSession(token),
            None => SessionState::NoSession,
        })
    }

    async fn open_session(&self, identity_id: &str, address: &str) -> Result<String, AuthError> {
        let token = self.issuer.issue(identity_id, address)?;
        self.sessions.put(address, &token).await?;
        Ok(token)
    }

    async fn hash_credential(&self, credential: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&credential))
            .await
            .map_err(|e| AuthError::permanent(format!("hashing task failed: {}", e)))?
            .map_err(AuthError::from)
    }

    async fn verify_credential(&self, credential: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let (credential, hash) = (credential.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&credential, &hash))
            .await
            .map_err(|e| AuthError::permanent(format!("verification task failed: {}", e)))
    }
}

fn report<T>(operation: &str, result: &Result<T, AuthError>) {
    match result {
        Ok(_) => info!(operation, "Auth operation succeeded"),
        Err(err @ AuthError::Unexpected { .. }) => warn!(
            operation,
            retryable = err.is_retryable(),
            cause = err.detail().unwrap_or_default(),
            "Auth operation failed"
        ),
        Err(err) => info!(operation, reason = %err, "Auth operation rejected"),
    }
}

/// Boundary result shape: `{success, message, token?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthResponse {
    pub fn with_token(message: impl Into<String>, token: String) -> Self {
        Self {
            success: true,
            message: message.into(),
            token: Some(token),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            token: None,
        }
    }

    pub fn failure(err: &AuthError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            token: None,
        }
    }
}
