//! Session token issuing and verification
//!
//! Tokens are HS256 JWTs signed with a process-wide secret. Verification is
//! purely cryptographic and temporal; it never looks at the session store.
//! Implemented by hand on top of `hmac`/`sha2` to keep the claim set and the
//! error variants under our control.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (1 day)
pub const DEFAULT_TOKEN_TTL: u64 = 24 * 60 * 60;

/// Longest accepted token lifetime in seconds (10 years)
pub const MAX_TOKEN_TTL: u64 = 10 * 365 * DEFAULT_TOKEN_TTL;

/// JWT Header for HS256
#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (identity ID)
    pub sub: String,
    /// Identity address, also the session key
    pub address: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration (Unix timestamp)
    pub exp: u64,
    /// Unique token ID, so two tokens minted in the same second differ
    pub jti: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer
    ///
    /// # Arguments
    /// * `secret` - HMAC key shared by every issued and verified token
    /// * `ttl` - Token lifetime in seconds
    pub fn new(secret: impl Into<String>, ttl: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Issue a token for `identity_id` / `address`, valid for the configured TTL.
    pub fn issue(&self, identity_id: &str, address: &str) -> Result<String, TokenError> {
        self.issue_at(identity_id, address, Utc::now())
    }

    /// Issue a token as if the clock read `now`
    ///
    /// # Returns
    /// * `Ok(String)` - The signed token
    /// * `Err(TokenError::Signing)` - If `now + ttl` does not fit in a
    ///   Unix timestamp, or signing fails
    pub fn issue_at(
        &self,
        identity_id: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = unix_seconds(now);
        let exp = iat
            .checked_add(self.ttl)
            .ok_or_else(|| TokenError::Signing(format!("ttl {} overflows expiry", self.ttl)))?;
        let claims = TokenClaims {
            sub: identity_id.to_string(),
            address: address.to_string(),
            iat,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode_jwt(&claims, &self.secret)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify against the clock reading `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims: TokenClaims = decode_jwt(token, &self.secret)?;

        if claims.exp <= unix_seconds(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

fn mac_for(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::Signing(format!("HMAC error: {}", e)))
}

/// Encode claims to JWT using HS256
fn encode_jwt<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    let header_json = serde_json::to_string(&JwtHeader::default())
        .map_err(|e| TokenError::Signing(e.to_string()))?;
    let header_b64 = URL_SAFE_NO_PAD.encode(header_json.as_bytes());

    let payload_json =
        serde_json::to_string(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());

    let signing_input = format!("{}.{}", header_b64, payload_b64);

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature_b64))
}

/// Decode and validate JWT using HS256
fn decode_jwt<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts[..] else {
        return Err(TokenError::Malformed("expected three segments"));
    };

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed("invalid signature encoding"))?;

    // Constant-time comparison
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenError::Malformed("invalid header encoding"))?;
    let header: JwtHeader = serde_json::from_slice(&header_bytes)
        .map_err(|_| TokenError::Malformed("invalid header format"))?;

    if header.alg != "HS256" {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Malformed("invalid payload encoding"))?;
    serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed("invalid payload format"))
}

/// Extract Bearer token from Authorization header
///
/// Returns `None` if the header is missing, uses another scheme, or carries
/// an empty token.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
