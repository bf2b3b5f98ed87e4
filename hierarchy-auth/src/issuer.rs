//! Token issuance seam
//!
//! The hierarchy engine only produces [`ScopeClaims`]; signing and
//! transport belong to a [`TokenIssuer`]. [`crate::jwt::JwtService`] is the
//! bundled implementation.

use serde::{Deserialize, Serialize};

use crate::claims::ScopeClaims;
use crate::error::AuthResult;

/// Turns claim bags into bearer credentials and back.
pub trait TokenIssuer: Send + Sync {
    /// Issue a short-lived access token.
    fn issue_access_token(&self, claims: &ScopeClaims) -> AuthResult<String>;

    /// Issue a long-lived refresh token.
    fn issue_refresh_token(&self, claims: &ScopeClaims) -> AuthResult<String>;

    /// Access token lifetime in seconds.
    fn access_token_ttl(&self) -> i64;

    /// Validate a token and return its claims.
    fn validate_token(&self, token: &str) -> AuthResult<ScopeClaims>;

    /// Issue an access and a refresh token for the same claims.
    fn issue_pair(&self, claims: &ScopeClaims) -> AuthResult<TokenPair> {
        Ok(TokenPair::new(
            self.issue_access_token(claims)?,
            self.issue_refresh_token(claims)?,
            self.access_token_ttl(),
        ))
    }
}

/// Token pair containing access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,

    /// Refresh token (long-lived)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token expiration in seconds
    pub expires_in: i64,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
