//! Session gate for protected operations
//!
//! Two stages, in order:
//! 1. the bearer token must be present, well formed, correctly signed and
//!    unexpired;
//! 2. a session must exist for the address in its claims.
//!
//! Stage 2 checks existence only; it does not compare the stored token with
//! the presented one, so a superseded but unexpired token still passes.

use tracing::{debug, warn};

use crate::error::{StoreError, TokenError};
use crate::session::SessionStore;
use crate::token::{extract_bearer_token, TokenClaims, TokenIssuer};

/// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateDenial {
    #[error("Authorization token is missing.")]
    MissingToken,

    #[error("The provided token is invalid or has expired.")]
    InvalidToken(TokenError),

    #[error("Session has expired. Please log in again.")]
    SessionExpired,

    #[error("Session could not be verified.")]
    StoreUnavailable(String),
}

impl From<StoreError> for GateDenial {
    fn from(e: StoreError) -> Self {
        GateDenial::StoreUnavailable(e.to_string())
    }
}

/// Result of a full gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow(TokenClaims),
    Deny(GateDenial),
}

/// Guards protected requests in two stages: a valid token, then a live
/// session for the token's address.
#[derive(Clone)]
pub struct SessionGate {
    issuer: TokenIssuer,
    sessions: SessionStore,
}

impl SessionGate {
    pub fn new(issuer: TokenIssuer, sessions: SessionStore) -> Self {
        Self { issuer, sessions }
    }

    /// Stage 1 only: extract and verify the bearer token.
    pub fn credentials(&self, auth_header: Option<&str>) -> Result<TokenClaims, GateDenial> {
        let token = extract_bearer_token(auth_header).ok_or(GateDenial::MissingToken)?;
        self.issuer.verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            GateDenial::InvalidToken(e)
        })
    }

    /// Run both stages
    ///
    /// # Arguments
    /// * `auth_header` - Raw `Authorization` header value, if any
    ///
    /// # Returns
    /// `Allow` with the verified claims, or `Deny` with the first failing
    /// reason. A store fault denies with `StoreUnavailable`.
    pub async fn check(&self, auth_header: Option<&str>) -> GateDecision {
        match self.try_check(auth_header).await {
            Ok(claims) => GateDecision::Allow(claims),
            Err(denial) => GateDecision::Deny(denial),
        }
    }

    async fn try_check(&self, auth_header: Option<&str>) -> Result<TokenClaims, GateDenial> {
        let claims = self.credentials(auth_header)?;

        let exists = self.sessions.exists(&claims.address).await.map_err(|e| {
            warn!(error = %e, "Session lookup failed");
            GateDenial::from(e)
        })?;

        if !exists {
            debug!(address = %claims.address, "No session for verified token");
            return Err(GateDenial::SessionExpired);
        }

        Ok(claims)
    }
}
