//! Session gate middleware
//!
//! Verified claims are stored in request extensions for the handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use session_core::GateDecision;

use crate::error::ApiError;
use crate::state::AppState;

/// Owned, so no borrow of the request is held across an await.
fn auth_header(req: &Request) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Valid token and a live session for its address.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = auth_header(&req);
    match state.gate.check(header.as_deref()).await {
        GateDecision::Allow(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        GateDecision::Deny(denial) => Err(denial.into()),
    }
}

/// Valid token only; the session may already be gone.
pub async fn require_credentials(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.gate.credentials(auth_header(&req).as_deref())?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
