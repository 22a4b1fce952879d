//! Request and response bodies for Session API

use serde::{Deserialize, Serialize};
use std::fmt;

use session_core::NewIdentity;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("age", &self.age)
            .finish()
    }
}

impl From<RegisterRequest> for NewIdentity {
    fn from(req: RegisterRequest) -> Self {
        NewIdentity {
            address: req.email,
            credential: req.password,
            full_name: req.full_name,
            age: req.age,
        }
    }
}

/// Body of `GET /auth/session`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub email: String,
    pub user_id: String,
    /// Token expiry (Unix timestamp)
    pub expires_at: u64,
}
