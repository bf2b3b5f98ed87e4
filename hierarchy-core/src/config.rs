//! Hierarchy engine configuration.
//!
//! Loaded from environment variables with defaults matching the production
//! account-number band (1700-1799, 100 tenant roots per day).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Numeric band that account-number suffixes are drawn from.
///
/// The suffix of an account number is `start + n` for the `n`-th allocation
/// of the day, so a band of width 100 caps allocations at 100 per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBand {
    /// First suffix of the band (inclusive).
    pub start: u32,

    /// Number of suffixes in the band.
    pub width: u32,
}

impl AccountBand {
    /// Last suffix of the band (inclusive).
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.width.saturating_sub(1))
    }

    /// Whether `sequence` falls inside the band.
    pub fn contains(&self, sequence: u32) -> bool {
        sequence >= self.start && sequence <= self.end()
    }

    /// Number of decimal digits in every suffix of the band.
    pub fn digits(&self) -> usize {
        self.start.to_string().len()
    }
}

impl Default for AccountBand {
    fn default() -> Self {
        Self {
            start: 1700,
            width: 100,
        }
    }
}

/// Configuration for allocators and the node lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Band used for tenant-root account numbers.
    pub account_band: AccountBand,

    /// Upper bound on optimistic collision retries in any allocation loop.
    pub max_allocation_attempts: u32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            account_band: AccountBand::default(),
            max_allocation_attempts: 10,
        }
    }
}

impl HierarchyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HIERARCHY_ACCOUNT_BAND_START`: first account suffix (default: 1700)
    /// - `HIERARCHY_ACCOUNT_BAND_WIDTH`: suffixes per day (default: 100)
    /// - `HIERARCHY_MAX_ALLOCATION_ATTEMPTS`: collision retry budget (default: 10)
    ///
    /// Missing or unparseable values fall back to the defaults; call
    /// [`HierarchyConfig::validate`] before use.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            account_band: AccountBand {
                start: env_parse("HIERARCHY_ACCOUNT_BAND_START")
                    .unwrap_or(default.account_band.start),
                width: env_parse("HIERARCHY_ACCOUNT_BAND_WIDTH")
                    .unwrap_or(default.account_band.width),
            },
            max_allocation_attempts: env_parse("HIERARCHY_MAX_ALLOCATION_ATTEMPTS")
                .unwrap_or(default.max_allocation_attempts),
        }
    }

    /// Check that the configuration can produce well-formed identifiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let band = &self.account_band;
        if band.width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HIERARCHY_ACCOUNT_BAND_WIDTH".to_string(),
                message: "band width must be at least 1".to_string(),
            });
        }
        if band.start == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HIERARCHY_ACCOUNT_BAND_START".to_string(),
                message: "band start must be positive".to_string(),
            });
        }
        if band.start.checked_add(band.width - 1).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "HIERARCHY_ACCOUNT_BAND_START".to_string(),
                message: format!("band of width {} starting at {} overflows", band.width, band.start),
            });
        }
        // Fixed total length requires every suffix in the band to have the same width.
        if band.end().to_string().len() != band.digits() {
            return Err(ConfigError::InvalidValue {
                key: "HIERARCHY_ACCOUNT_BAND_WIDTH".to_string(),
                message: format!(
                    "band {}-{} crosses a digit-width boundary",
                    band.start,
                    band.end()
                ),
            });
        }
        if self.max_allocation_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HIERARCHY_MAX_ALLOCATION_ATTEMPTS".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
