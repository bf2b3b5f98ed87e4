//! Error types for authentication operations
//!
//! Covers login failures, token validation and signing configuration.
//! Errors raised by the hierarchy engine pass through unchanged.

use hierarchy_core::HierarchyError;
use thiserror::Error;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,

    /// Token is invalid (malformed, bad signature, wrong type, etc.)
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token is missing a claim its caller kind requires
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Unknown account or wrong secret
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is inactive or suspended
    #[error("Account is locked")]
    AccountLocked,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Hierarchy engine error
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Invalid credentials and expired tokens are expected and should not
    /// be logged as errors.
    pub fn is_server_error(&self) -> bool {
        match self {
            AuthError::Internal(_) | AuthError::ConfigError(_) => true,
            AuthError::Hierarchy(e) => e.is_server_error(),
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::TokenExpired
            | AuthError::InvalidToken(_)
            | AuthError::MissingClaim(_)
            | AuthError::InvalidCredentials => 401,

            AuthError::AccountLocked => 403,

            AuthError::ConfigError(_) | AuthError::Internal(_) => 500,

            AuthError::Hierarchy(e) => e.status_code(),
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::MissingClaim(_) => "MISSING_CLAIM",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountLocked => "ACCOUNT_LOCKED",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
            AuthError::Hierarchy(e) => e.error_code(),
        }
    }
}
