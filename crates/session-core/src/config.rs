//! Process configuration
//!
//! Read once at startup from environment variables (a `.env` file is loaded
//! by the binary before this runs).

use std::time::Duration;

use thiserror::Error;

use crate::dispatcher::{DeliveryMode, DEFAULT_BATCH_SIZE};
use crate::notify::{DEFAULT_FROM_ADDRESS, DEFAULT_SUBJECT};
use crate::queue::DEFAULT_QUEUE_KEY;
use crate::scheduler::DEFAULT_DISPATCH_INTERVAL;
use crate::token::{DEFAULT_TOKEN_TTL, MAX_TOKEN_TTL};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Longest accepted dispatch period in seconds (1 day)
pub const MAX_DISPATCH_INTERVAL: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// HMAC key for session tokens
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub dispatch_interval_secs: u64,
    pub dispatch_batch_size: usize,
    pub delivery_mode: DeliveryMode,
    pub queue_key: String,
    pub session_key_prefix: String,
    /// No URL means the in-process store
    pub redis_url: Option<String>,
    /// No key means confirmations are only logged
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub mail_subject: String,
    pub port: u16,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("dispatch_interval_secs", &self.dispatch_interval_secs)
            .field("dispatch_batch_size", &self.dispatch_batch_size)
            .field("delivery_mode", &self.delivery_mode)
            .field("queue_key", &self.queue_key)
            .field("session_key_prefix", &self.session_key_prefix)
            .field("redis", &self.redis_url.is_some())
            .field("resend", &self.resend_api_key.is_some())
            .field("mail_from", &self.mail_from)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: DEFAULT_TOKEN_TTL,
            dispatch_interval_secs: DEFAULT_DISPATCH_INTERVAL,
            dispatch_batch_size: DEFAULT_BATCH_SIZE,
            delivery_mode: DeliveryMode::default(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            session_key_prefix: String::new(),
            redis_url: None,
            resend_api_key: None,
            mail_from: DEFAULT_FROM_ADDRESS.to_string(),
            mail_subject: DEFAULT_SUBJECT.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Self {
            jwt_secret,
            token_ttl_secs: parse_or(get("TOKEN_TTL_SECS"), "TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            dispatch_interval_secs: parse_or(
                get("DISPATCH_INTERVAL_SECS"),
                "DISPATCH_INTERVAL_SECS",
                defaults.dispatch_interval_secs,
            )?,
            dispatch_batch_size: parse_or(
                get("DISPATCH_BATCH_SIZE"),
                "DISPATCH_BATCH_SIZE",
                defaults.dispatch_batch_size,
            )?,
            delivery_mode: parse_or(get("DELIVERY_MODE"), "DELIVERY_MODE", defaults.delivery_mode)?,
            queue_key: get("QUEUE_KEY").unwrap_or(defaults.queue_key),
            session_key_prefix: lookup("SESSION_KEY_PREFIX").unwrap_or_default(),
            redis_url: get("REDIS_URL"),
            resend_api_key: get("RESEND_API_KEY"),
            mail_from: get("MAIL_FROM").unwrap_or(defaults.mail_from),
            mail_subject: get("MAIL_SUBJECT").unwrap_or(defaults.mail_subject),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        check_range("TOKEN_TTL_SECS", self.token_ttl_secs, MAX_TOKEN_TTL)?;
        check_range(
            "DISPATCH_INTERVAL_SECS",
            self.dispatch_interval_secs,
            MAX_DISPATCH_INTERVAL,
        )?;
        if self.dispatch_batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "DISPATCH_BATCH_SIZE",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(self)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }
}

/// Reject zero and anything above `max`.
fn check_range(var: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: format!("must be between 1 and {}", max),
        });
    }
    Ok(())
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(settings.jwt_secret, "s3cret");
        assert_eq!(settings.token_ttl_secs, 86400);
        assert_eq!(settings.dispatch_interval(), Duration::from_secs(10));
        assert_eq!(settings.dispatch_batch_size, 10);
        assert_eq!(settings.delivery_mode, DeliveryMode::AtMostOnce);
        assert_eq!(settings.queue_key, "email_queue");
        assert_eq!(settings.session_key_prefix, "");
        assert!(settings.redis_url.is_none());
        assert!(settings.resend_api_key.is_none());
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_secret_required() {
        assert_eq!(settings(&[]), Err(ConfigError::Missing("JWT_SECRET")));
        assert_eq!(
            settings(&[("JWT_SECRET", "  ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECS", "60"),
            ("DISPATCH_BATCH_SIZE", "25"),
            ("DELIVERY_MODE", "at-least-once"),
            ("SESSION_KEY_PREFIX", "session:"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(settings.token_ttl_secs, 60);
        assert_eq!(settings.dispatch_batch_size, 25);
        assert_eq!(settings.delivery_mode, DeliveryMode::AtLeastOnce);
        assert_eq!(settings.session_key_prefix, "session:");
        assert_eq!(settings.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = settings(&[("JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));

        let err = settings(&[("JWT_SECRET", "s"), ("DELIVERY_MODE", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DELIVERY_MODE", .. }));

        let err = settings(&[("JWT_SECRET", "s"), ("DISPATCH_BATCH_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DISPATCH_BATCH_SIZE", .. }));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let err = settings(&[("JWT_SECRET", "s"), ("TOKEN_TTL_SECS", "18446744073709551615")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TOKEN_TTL_SECS", .. }));

        let err = settings(&[("JWT_SECRET", "s"), ("DISPATCH_INTERVAL_SECS", "18446744073709551615")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DISPATCH_INTERVAL_SECS", .. }));

        // The caps themselves are accepted
        let max_ttl = MAX_TOKEN_TTL.to_string();
        let max_interval = MAX_DISPATCH_INTERVAL.to_string();
        let settings = settings(&[
            ("JWT_SECRET", "s"),
            ("TOKEN_TTL_SECS", max_ttl.as_str()),
            ("DISPATCH_INTERVAL_SECS", max_interval.as_str()),
        ])
        .unwrap();
        assert_eq!(settings.token_ttl_secs, MAX_TOKEN_TTL);
        assert_eq!(settings.dispatch_interval_secs, MAX_DISPATCH_INTERVAL);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = settings(&[("JWT_SECRET", "s3cret"), ("RESEND_API_KEY", "re_live")]).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("re_live"));
    }
}
