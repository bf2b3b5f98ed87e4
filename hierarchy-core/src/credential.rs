//! Credential hashing and password policy
//!
//! The engine only needs a one-way hash and a constant-time verify. The
//! default implementation is bcrypt, run on the blocking thread pool so a
//! high cost factor never stalls the async executor.

use async_trait::async_trait;

use crate::error::{HierarchyError, HierarchyResult};

/// One-way credential hash with verification.
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    /// Hash a clear-text secret.
    async fn hash(&self, secret: &str) -> HierarchyResult<String>;

    /// Check a clear-text secret against a stored hash.
    async fn verify(&self, secret: &str, hash: &str) -> HierarchyResult<bool>;
}

/// bcrypt-backed [`CredentialHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Create a hasher with an explicit work factor (4..=31).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// The configured work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

fn hashing_failed(e: impl std::fmt::Display) -> HierarchyError {
    HierarchyError::Hashing(e.to_string())
}

#[async_trait]
impl CredentialHasher for BcryptHasher {
    async fn hash(&self, secret: &str) -> HierarchyResult<String> {
        let secret = secret.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost))
            .await
            .map_err(hashing_failed)?
            .map_err(hashing_failed)
    }

    async fn verify(&self, secret: &str, hash: &str) -> HierarchyResult<bool> {
        let secret = secret.to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
            .await
            .map_err(hashing_failed)?;

        // A malformed stored hash cannot match anything.
        Ok(verified.unwrap_or(false))
    }
}

const SPECIAL_CHARACTERS: &str = "!@#$%^&*";

/// Strength rules for chosen (non-generated) secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in characters
    pub min_length: usize,

    /// Require at least one ASCII uppercase letter
    pub require_uppercase: bool,

    /// Require at least one ASCII lowercase letter
    pub require_lowercase: bool,

    /// Require at least one ASCII digit
    pub require_digit: bool,

    /// Require at least one of `!@#$%^&*`
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// Reject a secret that breaks any rule.
    ///
    /// The error never echoes the secret itself.
    pub fn validate(&self, secret: &str) -> HierarchyResult<()> {
        let mut missing = Vec::new();

        if secret.chars().count() < self.min_length {
            missing.push(format!("at least {} characters", self.min_length));
        }
        if self.require_uppercase && !secret.chars().any(|c| c.is_ascii_uppercase()) {
            missing.push("an uppercase letter".to_string());
        }
        if self.require_lowercase && !secret.chars().any(|c| c.is_ascii_lowercase()) {
            missing.push("a lowercase letter".to_string());
        }
        if self.require_digit && !secret.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a digit".to_string());
        }
        if self.require_special && !secret.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            missing.push(format!("one of {}", SPECIAL_CHARACTERS));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HierarchyError::invalid_format(
                "password",
                format!("must contain {}", missing.join(", ")),
            ))
        }
    }
}
