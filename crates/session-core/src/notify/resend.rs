//! Resend API client
//!
//! Sends the confirmation email through Resend's HTTP API
//! (https://api.resend.com/emails).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{ConfirmationMessage, NotificationSender, DEFAULT_FROM_ADDRESS};
use crate::error::SendError;

/// Resend API endpoint
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Resend API configuration
#[derive(Debug, Clone)]
pub struct ResendConfig {
    /// Resend API key (re_xxxxxxxxxx)
    pub api_key: String,
    /// From address for emails
    pub from_address: String,
    /// API endpoint, overridable for tests
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub message: ConfirmationMessage,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            endpoint: RESEND_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            message: ConfirmationMessage::default(),
        }
    }
}

/// Resend API request payload
#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<ResendTag<'a>>,
}

/// Resend tag for tracking
#[derive(Debug, Serialize)]
struct ResendTag<'a> {
    name: &'a str,
    value: &'a str,
}

/// Resend API success response
#[derive(Debug, Deserialize)]
struct ResendSuccessResponse {
    id: String,
}

/// Resend API error response
#[derive(Debug, Deserialize)]
struct ResendErrorResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ResendSender {
    client: reqwest::Client,
    config: ResendConfig,
}

impl ResendSender {
    pub fn new(config: ResendConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationSender for ResendSender {
    #[instrument(skip(self), fields(provider = "resend"))]
    async fn send(&self, address: &str) -> Result<(), SendError> {
        let payload = ResendPayload {
            from: &self.config.from_address,
            to: [address],
            subject: &self.config.message.subject,
            text: &self.config.message.text,
            tags: vec![ResendTag {
                name: "type",
                value: "registration",
            }],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            match response.json::<ResendSuccessResponse>().await {
                Ok(success) => debug!(id = %success.id, "Email sent via Resend"),
                // Accepted but unreadable body; the email most likely went out
                Err(e) => warn!(error = %e, "Resend response parse error"),
            }
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        let error_message = serde_json::from_str::<ResendErrorResponse>(&error_text)
            .ok()
            .and_then(|err| err.message.or(err.name))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        warn!(status = status.as_u16(), error = %error_message, "Resend rejected email");

        Err(match status.as_u16() {
            429 => SendError::RateLimited,
            401 => SendError::Rejected("email service authentication failed".to_string()),
            403 => SendError::Rejected("email service access denied".to_string()),
            500..=599 => SendError::Transport(format!(
                "email service unavailable: {}",
                error_message
            )),
            _ => SendError::Rejected(error_message),
        })
    }
}
