//! Tenant-root account numbers
//!
//! An account number is a six-digit allocation date (`YYMMDD`) followed by
//! a suffix drawn from a fixed numeric band, e.g. `2412161700` for the first
//! tenant root registered on 2024-12-16 with the default band 1700-1799.
//! Account numbers share a single platform-wide namespace.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{AccountBand, HierarchyConfig};
use crate::error::{HierarchyError, HierarchyResult};
use crate::store::TenantStore;

/// Length of the date prefix.
pub const DATE_PREFIX_LEN: usize = 6;

const DATE_FORMAT: &str = "%y%m%d";

/// Globally unique, date-banded identifier of a tenant root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Wrap a value read back from storage without re-validating it.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw account number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Date encoded in the prefix, if it is a calendar date.
    pub fn creation_date(&self) -> Option<NaiveDate> {
        let prefix = self.0.get(..DATE_PREFIX_LEN)?;
        NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()
    }

    /// Numeric band suffix.
    pub fn sequence(&self) -> Option<u32> {
        self.0.get(DATE_PREFIX_LEN..)?.parse().ok()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of the allocation date.
pub trait Clock: Send + Sync {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Reads the date from the system clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Per-day allocation statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAccountStats {
    /// Date prefix (`YYMMDD`)
    pub date: String,
    /// Account numbers already issued with this prefix
    pub issued: u64,
    /// Maximum allocations per day (the band width)
    pub capacity: u32,
    /// Allocations left today
    pub remaining: u32,
    /// Next account number that would be issued, if any
    pub next: Option<AccountNumber>,
    /// Band as `start-end`
    pub sequence_range: String,
}

/// Mints account numbers for new tenant roots.
///
/// The suffix starts at `band.start + issued_today` and moves forward on
/// collision. Passing the end of the band is a hard failure: the band
/// width caps tenant-root registrations per day.
#[derive(Debug, Clone, Copy)]
pub struct AccountNumberAllocator {
    band: AccountBand,
    max_attempts: u32,
}

impl AccountNumberAllocator {
    /// Create an allocator over `band` with a collision retry budget.
    pub fn new(band: AccountBand, max_attempts: u32) -> Self {
        Self {
            band,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create an allocator from engine configuration.
    pub fn from_config(config: &HierarchyConfig) -> Self {
        Self::new(config.account_band, config.max_allocation_attempts)
    }

    /// The configured band.
    pub fn band(&self) -> AccountBand {
        self.band
    }

    /// Allocate an unused account number for `date`.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::CapacityExceeded`] when the band is exhausted for
    /// the day or the attempt budget runs out.
    pub async fn allocate(
        &self,
        store: &dyn TenantStore,
        date: NaiveDate,
    ) -> HierarchyResult<AccountNumber> {
        let prefix = date.format(DATE_FORMAT).to_string();
        let issued = store.count_account_numbers_with_prefix(&prefix).await?;
        let offset = u32::try_from(issued).unwrap_or(u32::MAX);
        let mut sequence = self.band.start.saturating_add(offset);
        let scope = || format!("accounts on {}", prefix);

        for attempt in 1..=self.max_attempts {
            let candidate = format!("{}{}", prefix, sequence);
            if !self.band.contains(sequence) {
                return Err(HierarchyError::CapacityExceeded {
                    scope: scope(),
                    attempted: candidate,
                    reason: format!(
                        "band {}-{} allows {} allocations per day",
                        self.band.start,
                        self.band.end(),
                        self.band.width
                    ),
                });
            }

            tracing::debug!(attempt, candidate = %candidate, "Trying account number");
            if !store.exists_by_account_number(&candidate).await? {
                return Ok(AccountNumber(candidate));
            }

            tracing::warn!(attempt, candidate = %candidate, "Account number collision, retrying");
            sequence = sequence.saturating_add(1);
        }

        Err(HierarchyError::CapacityExceeded {
            scope: scope(),
            attempted: format!("{}{}", prefix, sequence.saturating_sub(1)),
            reason: format!("{} allocation attempts exhausted", self.max_attempts),
        })
    }

    /// Format check: date-prefix length, band membership and total length.
    ///
    /// Used both on freshly generated numbers and for independent
    /// pre-submission validation.
    pub fn is_valid(&self, value: &str) -> bool {
        if value.len() != DATE_PREFIX_LEN + self.band.digits()
            || !value.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }

        let candidate = AccountNumber::from_stored(value);
        candidate.creation_date().is_some()
            && candidate
                .sequence()
                .map(|seq| self.band.contains(seq))
                .unwrap_or(false)
    }

    /// Parse an externally supplied account number.
    pub fn parse(&self, value: &str) -> HierarchyResult<AccountNumber> {
        let value = value.trim();
        if self.is_valid(value) {
            Ok(AccountNumber(value.to_string()))
        } else {
            Err(HierarchyError::invalid_format("account number", value))
        }
    }

    /// Allocation statistics for `date`.
    pub async fn daily_stats(
        &self,
        store: &dyn TenantStore,
        date: NaiveDate,
    ) -> HierarchyResult<DailyAccountStats> {
        let prefix = date.format(DATE_FORMAT).to_string();
        let issued = store.count_account_numbers_with_prefix(&prefix).await?;
        let remaining = u64::from(self.band.width).saturating_sub(issued);
        let next = match self.allocate(store, date).await {
            Ok(number) => Some(number),
            Err(HierarchyError::CapacityExceeded { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(DailyAccountStats {
            date: prefix,
            issued,
            capacity: self.band.width,
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
            next,
            sequence_range: format!("{}-{}", self.band.start, self.band.end()),
        })
    }
}

impl Default for AccountNumberAllocator {
    fn default() -> Self {
        Self::from_config(&HierarchyConfig::default())
    }
}
