//! Error types for Session API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use session_core::{AuthError, AuthResponse, FailureKind, GateDenial};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Gate(#[from] GateDenial),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::InvalidCredentials)
            | ApiError::Auth(AuthError::TokenInvalidOrExpired(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::NoActiveSession) => StatusCode::NOT_FOUND,
            ApiError::Auth(AuthError::Unexpected {
                kind: FailureKind::Transient,
                ..
            }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Auth(AuthError::Unexpected { .. })
            | ApiError::Auth(AuthError::NotificationDispatchFailure(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Gate(GateDenial::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Gate(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Causes were already logged where they happened
        let body = match &self {
            ApiError::Auth(err) => AuthResponse::failure(err),
            ApiError::Gate(denial) => AuthResponse {
                success: false,
                message: denial.to_string(),
                token: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
