//! Outbound confirmation notifications
//!
//! The dispatcher hands each queued address to a [`NotificationSender`].
//! Senders may be slow or fail; the dispatcher decides what a failure means.

pub mod resend;

use async_trait::async_trait;
use tracing::info;

use crate::error::SendError;

pub use resend::{ResendConfig, ResendSender};

/// Default from address for confirmation emails
pub const DEFAULT_FROM_ADDRESS: &str = "Accounts <noreply@example.com>";

/// Default subject line for the registration confirmation
pub const DEFAULT_SUBJECT: &str = "Registration confirmation";

/// Default plain-text body for the registration confirmation
pub const DEFAULT_BODY: &str = "Thank you for signing up to our platform!";

#[async_trait]
pub trait NotificationSender: Send + Sync + 'static {
    /// Deliver the registration confirmation to `address`.
    async fn send(&self, address: &str) -> Result<(), SendError>;
}

/// Content of the confirmation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationMessage {
    pub subject: String,
    pub text: String,
}

impl Default for ConfirmationMessage {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            text: DEFAULT_BODY.to_string(),
        }
    }
}

/// Sender that only logs. Used when no email provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, address: &str) -> Result<(), SendError> {
        info!(to = %address, "Confirmation email (log only)");
        Ok(())
    }
}
