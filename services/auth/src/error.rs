//! Error type for the authentication service

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credentials did not resolve to an active account with that password
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    /// Username or password missing from the submission
    #[error("Must include \"username\" and \"password\".")]
    MissingCredentials,

    /// Presented token is past its expiry
    #[error("Token expired.")]
    TokenExpired,

    /// Missing, malformed or unknown token
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Resource already exists
    #[error("{0}")]
    Conflict(String),

    /// Body encoding the endpoint does not parse
    #[error("Unsupported media type")]
    UnsupportedMediaType,

    /// Infrastructure failure
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidCredentials | AuthError::MissingCredentials => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "code": "authorization",
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AuthError::TokenExpired | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AuthError::Internal(e) => {
                error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::BadRequest(rejection.body_text())
    }
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;
