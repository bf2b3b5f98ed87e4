//! Error types for hierarchy operations
//!
//! Every rejection carries enough context (tenant, level, attempted
//! identifier) for the caller to pick a different input.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Hierarchy error types.
///
/// Only the allocator collision loops retry internally; everything else is
/// reported synchronously to the caller.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// Duplicate external identifier or email
    #[error("Conflict: {field} '{value}' is already in use")]
    Conflict {
        /// Which unique field collided (e.g. "email")
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// Allocator band or attempt budget exhausted
    #[error("Capacity exceeded for {scope} (last attempted '{attempted}'): {reason}")]
    CapacityExceeded {
        /// Allocation scope, e.g. "tenant 0190... level 2" or "accounts on 241216"
        scope: String,
        /// Last identifier the allocator tried
        attempted: String,
        /// Why allocation stopped
        reason: String,
    },

    /// Missing or cross-tenant parent reference
    #[error("Invalid parent {parent_id} for tenant {tenant_id}: {reason}")]
    InvalidParent {
        /// Tenant the node was being created in
        tenant_id: Uuid,
        /// Parent reference supplied by the caller
        parent_id: Uuid,
        /// Why the parent was rejected
        reason: String,
    },

    /// Malformed identifier, path or input supplied externally
    #[error("Invalid {kind}: '{value}'")]
    InvalidFormat {
        /// What was being parsed (e.g. "tree path")
        kind: &'static str,
        /// The offending input
        value: String,
    },

    /// Scope check failed at the boundary
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("tenant", "node")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The initial credential of this node was already replaced
    #[error("Initial credential of node {node_id} has already been changed")]
    InitialCredentialConsumed {
        /// Node whose flag is already false
        node_id: Uuid,
    },

    /// Supplied secret does not match the stored credential
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credential hash primitive failure
    #[error("Credential hashing failed: {0}")]
    Hashing(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for hierarchy operations.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

impl HierarchyError {
    /// Shorthand for an [`HierarchyError::InvalidFormat`].
    pub fn invalid_format(kind: &'static str, value: impl Into<String>) -> Self {
        HierarchyError::InvalidFormat {
            kind,
            value: value.into(),
        }
    }

    /// Shorthand for a missing node.
    pub fn node_not_found(id: Uuid) -> Self {
        HierarchyError::NotFound {
            entity: "node",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing tenant root.
    pub fn tenant_not_found(id: impl ToString) -> Self {
        HierarchyError::NotFound {
            entity: "tenant",
            id: id.to_string(),
        }
    }

    /// Check if this error should be logged at error level.
    ///
    /// Conflicts and format errors are caller mistakes and expected.
    pub fn is_server_error(&self) -> bool {
        matches!(self, HierarchyError::Store(_) | HierarchyError::Hashing(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HierarchyError::Conflict { .. } | HierarchyError::InitialCredentialConsumed { .. } => {
                409
            }
            HierarchyError::CapacityExceeded { .. } => 503,
            HierarchyError::InvalidParent { .. } | HierarchyError::InvalidFormat { .. } => 400,
            HierarchyError::Unauthorized(_) => 403,
            HierarchyError::NotFound { .. } => 404,
            HierarchyError::InvalidCredentials => 401,
            HierarchyError::Hashing(_) | HierarchyError::Store(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            HierarchyError::Conflict { .. } => "CONFLICT",
            HierarchyError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            HierarchyError::InvalidParent { .. } => "INVALID_PARENT",
            HierarchyError::InvalidFormat { .. } => "INVALID_FORMAT",
            HierarchyError::Unauthorized(_) => "UNAUTHORIZED",
            HierarchyError::NotFound { .. } => "NOT_FOUND",
            HierarchyError::InitialCredentialConsumed { .. } => "INITIAL_CREDENTIAL_CONSUMED",
            HierarchyError::InvalidCredentials => "INVALID_CREDENTIALS",
            HierarchyError::Hashing(_) => "HASHING_ERROR",
            HierarchyError::Store(_) => "STORAGE_ERROR",
        }
    }
}
