//! Session API Server - HTTP surface for the session authority
//!
//! Provides REST endpoints for:
//! - Login, registration, token refresh and logout
//! - Session inspection behind the session gate
//!
//! Also runs the scheduler that drains the confirmation email queue.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use session_core::{IntervalTicker, QueueDispatcher, Scheduler, Settings};

mod error;
mod handlers;
mod middleware;
mod models;
mod state;


use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("session_api=info".parse()?)
                .add_directive("session_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let settings = Settings::from_env()?;
    info!(?settings, "Initializing Session API...");

    let store = state::connect_store(&settings).await?;
    let sender = state::build_sender(&settings)?;
    let state = Arc::new(AppState::from_settings(&settings, store.clone()));

    // Queue dispatcher on its own schedule
    let dispatcher = QueueDispatcher::new(state::notification_queue(&settings, store), sender)
        .with_batch_size(settings.dispatch_batch_size)
        .with_delivery_mode(settings.delivery_mode);
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::spawn(
        Arc::new(dispatcher),
        IntervalTicker::new(settings.dispatch_interval()),
        cancel.clone(),
    );

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Starting Session API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    scheduler.await?;

    Ok(())
}

/// Build the router with all routes and layers.
fn app(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Token and live session required
    let session_routes = Router::new()
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/session", get(handlers::session))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    // Token only, so logging out twice reaches the coordinator
    let logout_routes = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_credentials,
        ));

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Public auth endpoints
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .merge(session_routes)
        .merge(logout_routes)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
