//! Error types for the session authority and the queue dispatcher
//!
//! Every capability has its own error enum. The auth coordinator folds all
//! of them into [`AuthError`], which is what request paths ever see.

use thiserror::Error;

/// Errors raised by an [`EphemeralStore`](crate::store::EphemeralStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, dropped, timed out).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected a command.
    #[error("store command failed: {0}")]
    Command(String),

    /// A stored value could not be decoded.
    #[error("store value could not be decoded: {0}")]
    Codec(String),
}

impl StoreError {
    /// Whether retrying the same command later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            StoreError::Unavailable(e.to_string())
        } else if e.kind() == redis::ErrorKind::TypeError {
            StoreError::Codec(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

/// Token signing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(&'static str),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Credential hashing failures.
#[derive(Debug, Error)]
#[error("credential hashing failed: {0}")]
pub struct HashError(pub String);

/// Identity repository failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("an identity with address {0} already exists")]
    DuplicateAddress(String),

    #[error("identity repository unavailable: {0}")]
    Unavailable(String),

    #[error("identity repository error: {0}")]
    Other(String),
}

/// Notification delivery failures.
#[derive(Debug, Error)]
pub enum SendError {
    /// The provider refused the message (bad address, auth failure, ...).
    #[error("notification rejected: {0}")]
    Rejected(String),

    /// The provider asked us to slow down.
    #[error("notification rate limited")]
    RateLimited,

    /// The request never got a usable answer.
    #[error("notification transport failed: {0}")]
    Transport(String),
}

impl SendError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, SendError::Rejected(_))
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        SendError::Transport(e.to_string())
    }
}

/// Whether an unexpected failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Failures reported by the auth flow coordinator.
///
/// Messages are deliberately generic: the internal cause lives in `detail`
/// and in the logs, never in the message shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown address or wrong credential. The two are not distinguished.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("No token associated with this user was found.")]
    NoActiveSession,

    #[error("The provided token is invalid or has expired.")]
    TokenInvalidOrExpired(TokenError),

    /// A dispatch attempt failed. Only reported by the dispatcher.
    #[error("Notification could not be delivered.")]
    NotificationDispatchFailure(String),

    #[error("The request could not be completed.")]
    Unexpected { kind: FailureKind, detail: String },
}

impl AuthError {
    pub fn transient(detail: impl Into<String>) -> Self {
        AuthError::Unexpected {
            kind: FailureKind::Transient,
            detail: detail.into(),
        }
    }

    pub fn permanent(detail: impl Into<String>) -> Self {
        AuthError::Unexpected {
            kind: FailureKind::Permanent,
            detail: detail.into(),
        }
    }

    /// Whether the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Unexpected { kind, .. } => *kind == FailureKind::Transient,
            AuthError::NotificationDispatchFailure(_) => true,
            _ => false,
        }
    }

    /// Internal cause, for logs.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AuthError::Unexpected { detail, .. } | AuthError::NotificationDispatchFailure(detail) => {
                Some(detail)
            }
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        if e.is_transient() {
            AuthError::transient(e.to_string())
        } else {
            AuthError::permanent(e.to_string())
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(detail) => AuthError::permanent(detail),
            other => AuthError::TokenInvalidOrExpired(other),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(e: HashError) -> Self {
        AuthError::permanent(e.to_string())
    }
}

impl From<RepositoryError> for AuthError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Unavailable(_) => AuthError::transient(e.to_string()),
            _ => AuthError::permanent(e.to_string()),
        }
    }
}

impl From<SendError> for AuthError {
    fn from(e: SendError) -> Self {
        AuthError::NotificationDispatchFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_kinds() {
        let err: AuthError = StoreError::Unavailable("connection refused".into()).into();
        assert!(err.is_retryable());

        let err: AuthError = StoreError::Command("WRONGTYPE".into()).into();
        assert!(!err.is_retryable());
        assert_eq!(err.detail(), Some("store command failed: WRONGTYPE"));
    }

    #[test]
    fn test_messages_do_not_leak_detail() {
        let err = AuthError::permanent("argon2 exploded");
        assert_eq!(err.to_string(), "The request could not be completed.");
    }

    #[test]
    fn test_token_errors_map_to_invalid_token() {
        let err: AuthError = TokenError::Expired.into();
        assert_eq!(err, AuthError::TokenInvalidOrExpired(TokenError::Expired));

        let err: AuthError = TokenError::Signing("bad key".into()).into();
        assert!(matches!(
            err,
            AuthError::Unexpected {
                kind: FailureKind::Permanent,
                ..
            }
        ));
    }

    #[test]
    fn test_repository_errors() {
        let err: AuthError = RepositoryError::Unavailable("pool exhausted".into()).into();
        assert!(err.is_retryable());

        let err: AuthError = RepositoryError::DuplicateAddress("a@x.com".into()).into();
        assert!(!err.is_retryable());
    }
}
