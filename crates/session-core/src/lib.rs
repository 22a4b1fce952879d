//! Session core
//!
//! This crate provides the single-session token authority (login,
//! registration, refresh, logout and the session gate) and the dispatcher
//! that drains queued confirmation notifications, all over one shared
//! ephemeral key/value store.

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod identity;
pub mod notify;
pub mod password;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod token;

pub use auth::{AuthCoordinator, AuthResponse, Registered, SessionState};
pub use config::{ConfigError, Settings};
pub use dispatcher::{DeliveryMode, QueueDispatcher, TickOutcome, TickReport};
pub use error::{AuthError, FailureKind};
pub use gate::{GateDecision, GateDenial, SessionGate};
pub use identity::{Identity, IdentityRepository, MemoryIdentityRepository, NewIdentity};
pub use notify::{LogSender, NotificationSender, ResendConfig, ResendSender};
pub use password::{Argon2Hasher, CredentialHasher};
pub use queue::NotificationQueue;
pub use scheduler::{IntervalTicker, Scheduler, Ticker};
pub use session::SessionStore;
pub use store::{EphemeralStore, MemoryStore, RedisStore};
pub use token::{TokenClaims, TokenIssuer};
