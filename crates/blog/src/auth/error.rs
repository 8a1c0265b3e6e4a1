//! Authentication errors.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::ApiError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing authorization header.
    #[error("missing authorization header")]
    MissingAuthHeader,

    /// Invalid authorization header format.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// Signature, issuer or subject check failed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    /// Authenticated but lacking a required role.
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Rejected input to a primitive, e.g. an empty password.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal auth error: {0}")]
    Internal(String),
}

/// Rendered through [`ApiError`] so every error response shares one body shape.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
