//! # Tenant Hierarchy Authentication
//!
//! Login flows for tenant roots and hierarchy nodes, and tokens that carry
//! the caller's hierarchy position.
//!
//! ## Overview
//!
//! The hierarchy-auth crate handles:
//! - **Login**: Email sign-in for tenant roots, account number plus
//!   hierarchical id for nodes
//! - **Claims**: Tenant id, node id, level and path, enough to rebuild a
//!   [`hierarchy_access::Caller`] without a store lookup
//! - **JWT**: Token signing and validation (feature `jwt`)
//!
//! ## Features
//!
//! - `jwt` (default): JWT token support using jsonwebtoken
//!
//! ## Architecture
//!
//! ```text
//! login_node("2412161700", "L1-001", secret)
//!        │
//!        ▼
//!   Authenticator ──► ScopeClaims ──► TokenIssuer ──► TokenPair
//!                                          │
//!   request token ─────────────────────────┘ validate_token
//!        │
//!        ▼
//!   ScopeClaims::to_caller() ──► hierarchy_access::ScopeResolver
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hierarchy_auth::{Authenticator, JwtConfig, JwtService, TokenIssuer};
//! use hierarchy_core::{BcryptHasher, MemoryStore};
//!
//! # async fn example() -> hierarchy_auth::AuthResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let authenticator = Authenticator::new(store.clone(), store, Arc::new(BcryptHasher::default()));
//! let tokens = JwtService::new(JwtConfig::from_env()?)?;
//!
//! let outcome = authenticator.login_node("2412161700", "L1-001", "L1-001").await?;
//! let pair = tokens.issue_pair(&outcome.claims)?;
//!
//! let caller = tokens.validate_token(&pair.access_token)?.to_caller()?;
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod issuer;
#[cfg(feature = "jwt")]
pub mod jwt;

// Re-export main types
pub use authenticator::{Authenticator, LoginOutcome};
pub use claims::{ScopeClaims, TokenType, DEFAULT_ISSUER};
pub use error::{AuthError, AuthResult};
pub use issuer::{TokenIssuer, TokenPair};

#[cfg(feature = "jwt")]
pub use jwt::{JwtAlgorithm, JwtConfig, JwtService};
