//! Application state for Session API

use anyhow::Result;
use std::sync::Arc;

use session_core::{
    Argon2Hasher, AuthCoordinator, CredentialHasher, EphemeralStore, IdentityRepository,
    LogSender, MemoryIdentityRepository, MemoryStore, NotificationQueue, NotificationSender,
    RedisStore, ResendConfig, ResendSender, SessionGate, SessionStore, Settings, TokenIssuer,
};

pub struct AppState {
    pub auth: AuthCoordinator,
    pub gate: SessionGate,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn EphemeralStore>,
        identities: Arc<dyn IdentityRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let issuer = TokenIssuer::new(settings.jwt_secret.clone(), settings.token_ttl_secs);
        let sessions = SessionStore::new(store.clone(), settings.session_key_prefix.clone());
        let queue = notification_queue(settings, store);

        Self {
            gate: SessionGate::new(issuer.clone(), sessions.clone()),
            auth: AuthCoordinator::new(issuer, sessions, queue, identities, hasher),
        }
    }

    /// Production wiring: in-process identity repository, Argon2id hashing.
    pub fn from_settings(settings: &Settings, store: Arc<dyn EphemeralStore>) -> Self {
        Self::new(
            settings,
            store,
            Arc::new(MemoryIdentityRepository::new()),
            Arc::new(Argon2Hasher),
        )
    }
}

pub fn notification_queue(settings: &Settings, store: Arc<dyn EphemeralStore>) -> NotificationQueue {
    NotificationQueue::new(store, settings.queue_key.clone())
}

/// Redis when `REDIS_URL` is set, otherwise an in-process store.
pub async fn connect_store(settings: &Settings) -> Result<Arc<dyn EphemeralStore>> {
    match &settings.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis");
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Resend when `RESEND_API_KEY` is set, otherwise log-only delivery.
pub fn build_sender(settings: &Settings) -> Result<Arc<dyn NotificationSender>> {
    match &settings.resend_api_key {
        Some(api_key) => {
            let mut config = ResendConfig::new(api_key.clone());
            config.from_address = settings.mail_from.clone();
            config.message.subject = settings.mail_subject.clone();
            Ok(Arc::new(ResendSender::new(config)?))
        }
        None => {
            tracing::warn!("RESEND_API_KEY not set, confirmation emails will only be logged");
            Ok(Arc::new(LogSender))
        }
    }
}
