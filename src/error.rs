/// Unified error types for the auth service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which part of the token pipeline rejected a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStage {
    Access,
    Refresh,
    Pair,
}

impl fmt::Display for TokenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStage::Access => f.write_str("access token"),
            TokenStage::Refresh => f.write_str("refresh token"),
            TokenStage::Pair => f.write_str("token pair"),
        }
    }
}

/// Reasons a token is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, or claims that don't fit `Claims`
    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    #[error("user is not authorized")]
    Unauthorized,

    /// Refresh token is well formed but is not the stored one for its user
    #[error("token was not found in the database")]
    NotFound,

    #[error("usernames doesn't match")]
    UsernameMismatch,
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not exists")]
    UserNotExists,

    #[error("username already exists")]
    UsernameAlreadyExists,

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("phone already exists")]
    PhoneAlreadyExists,

    #[error("password is incorrect")]
    IncorrectPassword,

    #[error("confirmation code is incorrect")]
    InvalidCode,

    /// Token failures, tagged with the stage that failed
    #[error("error while checking {stage}: {source}")]
    Token {
        stage: TokenStage,
        #[source]
        source: TokenError,
    },

    /// Request rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database errors
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Startup configuration problems
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`AuthError`] for callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredential,
    InvalidToken,
    ExpiredToken,
    UsernameMismatch,
    Unauthorized,
    Validation,
    Storage,
    Internal,
}

impl AuthError {
    pub fn token(stage: TokenStage, source: TokenError) -> Self {
        AuthError::Token { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotExists => ErrorKind::NotFound,
            AuthError::UsernameAlreadyExists
            | AuthError::EmailAlreadyExists
            | AuthError::PhoneAlreadyExists => ErrorKind::AlreadyExists,
            AuthError::IncorrectPassword | AuthError::InvalidCode => ErrorKind::InvalidCredential,
            AuthError::Token { source, .. } => match source {
                TokenError::Invalid(_) => ErrorKind::InvalidToken,
                TokenError::Expired => ErrorKind::ExpiredToken,
                TokenError::Unauthorized => ErrorKind::Unauthorized,
                TokenError::NotFound => ErrorKind::NotFound,
                TokenError::UsernameMismatch => ErrorKind::UsernameMismatch,
            },
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Storage(_) => ErrorKind::Storage,
            AuthError::Config(_) | AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The token failure and its stage, if this is a token error
    pub fn token_failure(&self) -> Option<(TokenStage, &TokenError)> {
        match self {
            AuthError::Token { stage, source } => Some((*stage, source)),
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_code) = match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            ErrorKind::AlreadyExists => (StatusCode::CONFLICT, "AlreadyExists"),
            ErrorKind::NotFound => match self {
                AuthError::Token { .. } => (StatusCode::UNAUTHORIZED, "TokenNotFound"),
                _ => (StatusCode::NOT_FOUND, "NotFound"),
            },
            ErrorKind::InvalidCredential => (StatusCode::UNAUTHORIZED, "InvalidCredentials"),
            ErrorKind::InvalidToken => (StatusCode::UNAUTHORIZED, "InvalidToken"),
            ErrorKind::ExpiredToken => (StatusCode::UNAUTHORIZED, "ExpiredToken"),
            ErrorKind::UsernameMismatch => (StatusCode::UNAUTHORIZED, "UsernameMismatch"),
            ErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "Unauthorized"),
            ErrorKind::Storage | ErrorKind::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        };

        let message = match kind {
            // Don't leak details
            ErrorKind::Storage | ErrorKind::Internal => {
                tracing::error!("request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type AuthResult<T> = Result<T, AuthError>;
