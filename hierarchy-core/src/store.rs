//! Storage collaborator interfaces
//!
//! The engine never talks to a database directly. It consumes two async
//! traits, one per aggregate, which a relational backend implements with
//! unique indexes on:
//!
//! - tenant email and account number
//! - `(tenant_id, level, hierarchical_id)` for nodes
//! - node email and node external id, when present
//!
//! Uniqueness is enforced by storage and surfaced as
//! [`StoreError::Duplicate`]; the allocators only pre-check it, so two
//! instances racing on the same candidate are resolved on insert.
//! [`crate::memory::MemoryStore`] implements both traits for tests and
//! single-process deployments.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::hierarchical_id::HierarchicalId;
use crate::node::{Node, NodeDraft, NodeStatus, ProfileUpdate};
use crate::path::TreePath;
use crate::tenant::{TenantRoot, TenantStatus};

/// Unique index violated by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueConstraint {
    /// Tenant root email
    TenantEmail,
    /// Tenant root account number
    AccountNumber,
    /// `(tenant, level, hierarchical id)`
    HierarchicalId,
    /// Node contact email
    NodeEmail,
    /// Node external identifier
    ExternalId,
}

impl UniqueConstraint {
    /// Field name reported in a [`crate::HierarchyError::Conflict`].
    pub fn field(&self) -> &'static str {
        match self {
            UniqueConstraint::TenantEmail | UniqueConstraint::NodeEmail => "email",
            UniqueConstraint::AccountNumber => "account_number",
            UniqueConstraint::HierarchicalId => "hierarchical_id",
            UniqueConstraint::ExternalId => "external_id",
        }
    }
}

/// Storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("Duplicate value for {0:?}")]
    Duplicate(UniqueConstraint),

    /// The record to update does not exist
    #[error("Record not found")]
    NotFound,

    /// Backend failure (connection, query, serialization)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence of tenant roots.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert a new tenant root.
    ///
    /// Fails with [`StoreError::Duplicate`] on email or account number.
    async fn insert_tenant(&self, tenant: TenantRoot) -> StoreResult<()>;

    /// Set the status of a tenant root and return the updated record.
    async fn update_tenant_status(&self, id: Uuid, status: TenantStatus) -> StoreResult<TenantRoot>;

    /// Find a tenant root by id.
    async fn find_tenant(&self, id: Uuid) -> StoreResult<Option<TenantRoot>>;

    /// Find a tenant root by sign-in email.
    async fn find_tenant_by_email(&self, email: &str) -> StoreResult<Option<TenantRoot>>;

    /// Find a tenant root by account number.
    async fn find_tenant_by_account_number(&self, number: &str) -> StoreResult<Option<TenantRoot>>;

    /// Whether an account number is already issued.
    async fn exists_by_account_number(&self, number: &str) -> StoreResult<bool>;

    /// Whether a tenant root already uses `email`.
    async fn exists_tenant_email(&self, email: &str) -> StoreResult<bool>;

    /// Number of account numbers starting with `prefix` (a `YYMMDD` date).
    async fn count_account_numbers_with_prefix(&self, prefix: &str) -> StoreResult<u64>;
}

/// Persistence of hierarchy nodes.
///
/// Node creation is two-phase: [`NodeStore::insert_node`] makes the node's
/// identity durable without a path, then [`NodeStore::finalize_path`]
/// writes the path. Between the two calls the node counts towards
/// uniqueness checks and level counts but is not returned by any `find_*`
/// query.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Persist a node without its path and return the assigned id.
    async fn insert_node(&self, draft: NodeDraft) -> StoreResult<Uuid>;

    /// Write the final path of a freshly inserted node and return it.
    async fn finalize_path(&self, id: Uuid, path: TreePath) -> StoreResult<Node>;

    /// Remove a node that was inserted but never given a path, releasing
    /// its hierarchical id, email and external id.
    ///
    /// Returns `false` when no pending node with this id exists. Finalized
    /// nodes are never removed.
    async fn discard_pending(&self, id: Uuid) -> StoreResult<bool>;

    /// Replace the credential only if the node still uses its initial one,
    /// clearing the flag in the same write.
    ///
    /// Returns `false` when the flag was already cleared.
    async fn replace_initial_credential(&self, id: Uuid, credential_hash: String) -> StoreResult<bool>;

    /// Replace the credential unconditionally. The initial-credential flag
    /// is cleared.
    async fn set_credential(&self, id: Uuid, credential_hash: String) -> StoreResult<()>;

    /// Set the status of a node and return the updated record.
    async fn update_node_status(&self, id: Uuid, status: NodeStatus) -> StoreResult<Node>;

    /// Apply a partial profile update and return the updated record.
    async fn update_node_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Node>;

    /// Find a node by id.
    async fn find_node(&self, id: Uuid) -> StoreResult<Option<Node>>;

    /// Find a node by its hierarchical id within a tenant.
    async fn find_node_by_hierarchical_id(
        &self,
        tenant_id: Uuid,
        id: &HierarchicalId,
    ) -> StoreResult<Option<Node>>;

    /// Direct children of `parent_id`.
    async fn find_children_of(&self, parent_id: Uuid) -> StoreResult<Vec<Node>>;

    /// Nodes attached directly to the tenant root.
    async fn find_root_attached(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>>;

    /// Every node of a tenant.
    async fn find_in_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>>;

    /// Every node whose path starts with `prefix`, the prefix node included.
    async fn find_by_path_prefix(&self, prefix: &TreePath) -> StoreResult<Vec<Node>>;

    /// Nodes of a tenant that still sign in with their initial credential.
    async fn find_using_initial_credential(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>>;

    /// Whether `id` is already taken within `(tenant_id, level)`.
    async fn exists_by_identifier(
        &self,
        tenant_id: Uuid,
        level: u32,
        id: &HierarchicalId,
    ) -> StoreResult<bool>;

    /// Whether a node already uses `email`.
    async fn exists_node_email(&self, email: &str) -> StoreResult<bool>;

    /// Whether a node already uses `external_id`.
    async fn exists_external_id(&self, external_id: &str) -> StoreResult<bool>;

    /// Number of nodes at `(tenant_id, level)`.
    async fn count_at_level(&self, tenant_id: Uuid, level: u32) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_fields() {
        assert_eq!(UniqueConstraint::TenantEmail.field(), "email");
        assert_eq!(UniqueConstraint::NodeEmail.field(), "email");
        assert_eq!(UniqueConstraint::ExternalId.field(), "external_id");
        assert_eq!(UniqueConstraint::AccountNumber.field(), "account_number");
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Duplicate(UniqueConstraint::HierarchicalId);
        assert!(err.to_string().contains("HierarchicalId"));
        assert_eq!(
            StoreError::Backend("timeout".to_string()).to_string(),
            "Backend error: timeout"
        );
    }
}
