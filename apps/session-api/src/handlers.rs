//! HTTP handlers for Session API

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use session_core::{AuthResponse, TokenClaims};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Log in and open a session, replacing any previous one
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse::with_token("Login successful.", token)))
}

/// Register a new user and queue the confirmation email
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    state.auth.register(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::ok("User registered successfully.")),
    ))
}

/// Rotate the session token
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = state.auth.refresh(&claims.sub, &claims.address).await?;
    Ok(Json(AuthResponse::with_token("Token refreshed.", token)))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<AuthResponse>, ApiError> {
    state.auth.logout(&claims.address).await?;
    Ok(Json(AuthResponse::ok("Logged out successfully.")))
}

/// Describe the caller's session
pub async fn session(Extension(claims): Extension<TokenClaims>) -> Json<SessionResponse> {
    Json(SessionResponse {
        success: true,
        email: claims.address,
        user_id: claims.sub,
        expires_at: claims.exp,
    })
}
