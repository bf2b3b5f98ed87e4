//! Tenant root registration and maintenance.

use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::{AccountNumberAllocator, Clock, DailyAccountStats, SystemClock};
use crate::config::HierarchyConfig;
use crate::credential::{CredentialHasher, PasswordPolicy};
use crate::error::{HierarchyError, HierarchyResult};
use crate::store::{StoreError, TenantStore, UniqueConstraint};
use crate::tenant::{TenantRoot, TenantSignup, TenantStatus};

/// Registers tenant roots and issues their account numbers.
pub struct TenantRegistry {
    tenants: Arc<dyn TenantStore>,
    hasher: Arc<dyn CredentialHasher>,
    allocator: AccountNumberAllocator,
    clock: Arc<dyn Clock>,
    policy: PasswordPolicy,
    max_attempts: u32,
}

impl TenantRegistry {
    /// Create a registry reading the allocation date from the system clock.
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        hasher: Arc<dyn CredentialHasher>,
        config: &HierarchyConfig,
    ) -> Self {
        Self {
            tenants,
            hasher,
            allocator: AccountNumberAllocator::from_config(config),
            clock: Arc::new(SystemClock),
            policy: PasswordPolicy::default(),
            max_attempts: config.max_allocation_attempts.max(1),
        }
    }

    /// Use a different date source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different password policy.
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a tenant root.
    ///
    /// A duplicate email is rejected before an account number is allocated.
    /// When a concurrent registration claims the allocated number first,
    /// allocation re-runs within the attempt budget.
    pub async fn register(&self, signup: TenantSignup) -> HierarchyResult<TenantRoot> {
        let TenantSignup { profile, password } = signup;

        if profile.company_name.trim().is_empty() {
            return Err(HierarchyError::invalid_format("company name", ""));
        }
        if !looks_like_email(&profile.email) {
            return Err(HierarchyError::invalid_format("email", profile.email));
        }
        if self.tenants.exists_tenant_email(&profile.email).await? {
            return Err(HierarchyError::Conflict {
                field: "email",
                value: profile.email,
            });
        }
        self.policy.validate(&password)?;

        let credential_hash = self.hasher.hash(&password).await?;
        let date = self.clock.today();

        for attempt in 1..=self.max_attempts {
            let account_number = self.allocator.allocate(self.tenants.as_ref(), date).await?;
            let tenant = TenantRoot::new(account_number, profile.clone(), credential_hash.clone());

            match self.tenants.insert_tenant(tenant.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        tenant_id = %tenant.id,
                        account_number = %tenant.account_number,
                        outcome = "created",
                        "Tenant root registered"
                    );
                    return Ok(tenant);
                }
                Err(StoreError::Duplicate(UniqueConstraint::AccountNumber)) => {
                    tracing::warn!(
                        attempt,
                        account_number = %tenant.account_number,
                        "Account number taken on insert, reallocating"
                    );
                }
                Err(StoreError::Duplicate(constraint)) => {
                    return Err(HierarchyError::Conflict {
                        field: constraint.field(),
                        value: profile.email,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(HierarchyError::CapacityExceeded {
            scope: format!("accounts on {}", date.format("%y%m%d")),
            attempted: "account number".to_string(),
            reason: format!("{} insert attempts lost to concurrent registration", self.max_attempts),
        })
    }

    /// Find a tenant root by id.
    pub async fn find(&self, tenant_id: Uuid) -> HierarchyResult<TenantRoot> {
        self.tenants
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| HierarchyError::tenant_not_found(tenant_id))
    }

    /// Find a tenant root by account number.
    pub async fn find_by_account_number(&self, account_number: &str) -> HierarchyResult<TenantRoot> {
        let account_number = self.allocator.parse(account_number)?;
        self.tenants
            .find_tenant_by_account_number(account_number.as_str())
            .await?
            .ok_or_else(|| HierarchyError::tenant_not_found(account_number))
    }

    /// Activate, deactivate or suspend a tenant root.
    pub async fn change_status(
        &self,
        tenant_id: Uuid,
        status: TenantStatus,
    ) -> HierarchyResult<TenantRoot> {
        let tenant = self
            .tenants
            .update_tenant_status(tenant_id, status)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => HierarchyError::tenant_not_found(tenant_id),
                other => other.into(),
            })?;

        tracing::info!(%tenant_id, status = status.as_str(), "Tenant status changed");
        Ok(tenant)
    }

    /// Pre-submission format check of an account number.
    pub fn validate_identifier(&self, value: &str) -> bool {
        self.allocator.is_valid(value)
    }

    /// Allocation statistics for today.
    pub async fn daily_stats(&self) -> HierarchyResult<DailyAccountStats> {
        self.daily_stats_for(self.clock.today()).await
    }

    /// Allocation statistics for `date`.
    pub async fn daily_stats_for(&self, date: NaiveDate) -> HierarchyResult<DailyAccountStats> {
        self.allocator.daily_stats(self.tenants.as_ref(), date).await
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
