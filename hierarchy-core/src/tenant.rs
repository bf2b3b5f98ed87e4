//! Tenant root domain model
//!
//! A tenant root is the single top-level node of an organization. It owns
//! the whole hierarchy beneath it and is identified externally by its
//! date-banded account number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountNumber;

/// The top-level node owning a hierarchy.
///
/// # Architecture
///
/// ```text
/// TenantRoot (account number 2412161700)
///   ├─ Node L1-001   path /2412161700/L1-001/
///   │    └─ Node L2-001   path /2412161700/L1-001/L2-001/
///   └─ Node L1-002   path /2412161700/L1-002/
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRoot {
    /// Unique identifier
    pub id: Uuid,

    /// Platform-wide account number
    pub account_number: AccountNumber,

    /// Contact and company details
    pub profile: TenantProfile,

    /// One-way hash of the sign-in secret
    #[serde(skip_serializing, default)]
    pub credential_hash: String,

    /// Lifecycle status
    pub status: TenantStatus,

    /// When the tenant root was registered
    pub created_at: DateTime<Utc>,

    /// When the tenant root was last updated
    pub updated_at: DateTime<Utc>,
}

impl TenantRoot {
    /// Creates an active tenant root with a fresh UUID v7.
    pub fn new(account_number: AccountNumber, profile: TenantProfile, credential_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            account_number,
            profile,
            credential_hash,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the tenant root may sign in and act.
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Company and contact details of a tenant root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Official company name
    pub company_name: String,

    /// Sign-in email, unique across tenant roots
    pub email: String,

    /// Name of the responsible representative
    pub representative: String,

    /// Representative's department
    pub department: Option<String>,

    /// Representative's position
    pub position: Option<String>,

    /// Contact phone number
    pub phone: Option<String>,

    /// Postal address
    pub address: Option<String>,
}

impl TenantProfile {
    /// Profile with the required fields only.
    pub fn new(
        company_name: impl Into<String>,
        email: impl Into<String>,
        representative: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            email: email.into(),
            representative: representative.into(),
            department: None,
            position: None,
            phone: None,
            address: None,
        }
    }
}

/// Registration request for a new tenant root.
#[derive(Debug, Clone)]
pub struct TenantSignup {
    /// Company and contact details
    pub profile: TenantProfile,

    /// Initial sign-in secret, in clear text
    pub password: String,
}

/// Tenant root lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Operating normally
    Active,

    /// Deactivated, cannot sign in
    Inactive,

    /// Suspended by an administrator
    Suspended,
}

impl TenantStatus {
    /// Get the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Suspended => "suspended",
        }
    }

    /// Parse status from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(TenantStatus::Active),
            "inactive" => Some(TenantStatus::Inactive),
            "suspended" => Some(TenantStatus::Suspended),
            _ => None,
        }
    }
}
