//! Error type for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// A domain rule was violated; the message is shown to the client
    #[error("{0}")]
    Business(String),

    /// Too many failed logins for this username
    #[error("Too many failed login attempts, try again later")]
    TooManyAttempts,

    /// Missing or invalid credentials on a protected route
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn business(message: impl Into<String>) -> Self {
        AuthError::Business(message.into())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(inner: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(inner.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::Business(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AuthError::Database(_) | AuthError::Token(_) | AuthError::PasswordHash(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;
