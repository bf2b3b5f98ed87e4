//! JWT token generation and validation
//!
//! This module signs [`ScopeClaims`] with the jsonwebtoken crate.
//! It supports HS256/384/512, RS256/384/512 and ES256/384.

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::claims::{ScopeClaims, TokenType, DEFAULT_ISSUER};
use crate::error::{AuthError, AuthResult};
use crate::issuer::TokenIssuer;

/// JWT configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC algorithms
    pub secret: Option<String>,

    /// Private key (PEM) for RSA/EC algorithms
    pub private_key: Option<String>,

    /// Public key (PEM) for RSA/EC algorithms
    pub public_key: Option<String>,

    /// Algorithm to use
    pub algorithm: JwtAlgorithm,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: Vec<String>,

    /// Access token duration
    pub access_token_duration: Duration,

    /// Refresh token duration
    pub refresh_token_duration: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            private_key: None,
            public_key: None,
            algorithm: JwtAlgorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: vec!["hierarchy".to_string()],
            access_token_duration: Duration::hours(1),
            refresh_token_duration: Duration::days(7),
        }
    }
}

impl JwtConfig {
    /// Load an HMAC configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HIERARCHY_JWT_SECRET`: signing secret (required)
    /// - `HIERARCHY_JWT_ISSUER`: issuer (default: tenant-hierarchy)
    /// - `HIERARCHY_JWT_ACCESS_MINUTES`: access token lifetime (default: 60)
    /// - `HIERARCHY_JWT_REFRESH_DAYS`: refresh token lifetime (default: 7)
    pub fn from_env() -> AuthResult<Self> {
        let secret = std::env::var("HIERARCHY_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::ConfigError("HIERARCHY_JWT_SECRET is not set".to_string()))?;

        let default = Self::default();
        let access_minutes = env_parse("HIERARCHY_JWT_ACCESS_MINUTES")
            .unwrap_or(default.access_token_duration.num_minutes());
        let refresh_days = env_parse("HIERARCHY_JWT_REFRESH_DAYS")
            .unwrap_or(default.refresh_token_duration.num_days());

        Ok(Self {
            secret: Some(secret),
            issuer: std::env::var("HIERARCHY_JWT_ISSUER").unwrap_or(default.issuer),
            access_token_duration: Duration::minutes(access_minutes),
            refresh_token_duration: Duration::days(refresh_days),
            ..Self::default()
        })
    }
}

fn env_parse(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Supported JWT algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
            JwtAlgorithm::ES256 => Algorithm::ES256,
            JwtAlgorithm::ES384 => Algorithm::ES384,
        }
    }
}

/// JWT-backed [`TokenIssuer`].
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the key material for the algorithm is missing or
    /// unparseable.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        let (encoding_key, decoding_key) = Self::create_keys(&config)?;
        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Create with a simple secret (HS256).
    pub fn with_secret(secret: impl Into<String>) -> AuthResult<Self> {
        Self::new(JwtConfig {
            secret: Some(secret.into()),
            ..Default::default()
        })
    }

    fn create_keys(config: &JwtConfig) -> AuthResult<(EncodingKey, DecodingKey)> {
        let require = |key: &Option<String>, what: &str| {
            key.clone()
                .ok_or_else(|| AuthError::ConfigError(format!("{} required for {:?}", what, config.algorithm)))
        };
        let invalid = |what: &str, e: jsonwebtoken::errors::Error| {
            AuthError::ConfigError(format!("Invalid {}: {}", what, e))
        };

        match config.algorithm {
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => {
                let secret = require(&config.secret, "Secret")?;
                Ok((
                    EncodingKey::from_secret(secret.as_bytes()),
                    DecodingKey::from_secret(secret.as_bytes()),
                ))
            }
            JwtAlgorithm::RS256 | JwtAlgorithm::RS384 | JwtAlgorithm::RS512 => {
                let private_key = require(&config.private_key, "Private key")?;
                let public_key = require(&config.public_key, "Public key")?;
                Ok((
                    EncodingKey::from_rsa_pem(private_key.as_bytes())
                        .map_err(|e| invalid("RSA private key", e))?,
                    DecodingKey::from_rsa_pem(public_key.as_bytes())
                        .map_err(|e| invalid("RSA public key", e))?,
                ))
            }
            JwtAlgorithm::ES256 | JwtAlgorithm::ES384 => {
                let private_key = require(&config.private_key, "Private key")?;
                let public_key = require(&config.public_key, "Public key")?;
                Ok((
                    EncodingKey::from_ec_pem(private_key.as_bytes())
                        .map_err(|e| invalid("EC private key", e))?,
                    DecodingKey::from_ec_pem(public_key.as_bytes())
                        .map_err(|e| invalid("EC public key", e))?,
                ))
            }
        }
    }

    fn encode_claims(&self, claims: &ScopeClaims, token_type: TokenType) -> AuthResult<String> {
        let duration = match token_type {
            TokenType::Access => self.config.access_token_duration,
            TokenType::Refresh => self.config.refresh_token_duration,
        };
        let claims = claims.clone().stamped(
            &self.config.issuer,
            &self.config.audience,
            duration,
            token_type,
        );

        let header = Header::new(self.config.algorithm.into());
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Get the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

impl TokenIssuer for JwtService {
    fn issue_access_token(&self, claims: &ScopeClaims) -> AuthResult<String> {
        self.encode_claims(claims, TokenType::Access)
    }

    fn issue_refresh_token(&self, claims: &ScopeClaims) -> AuthResult<String> {
        self.encode_claims(claims, TokenType::Refresh)
    }

    fn access_token_ttl(&self) -> i64 {
        self.config.access_token_duration.num_seconds()
    }

    fn validate_token(&self, token: &str) -> AuthResult<ScopeClaims> {
        let mut validation = Validation::new(self.config.algorithm.into());
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&self.config.audience);

        decode::<ScopeClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AuthError::InvalidToken("Malformed token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::InvalidToken("Invalid issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("Invalid audience".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}
