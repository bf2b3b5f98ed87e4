//! # Access Scope
//!
//! The set of nodes a caller may view or manage.
//!
//! - **Tenant root**: every node of its tenant.
//! - **Hierarchy node** at level `L` with path `P`: itself, plus nodes at
//!   level `L + 1` whose path is `P` followed by exactly one segment.
//!
//! Grandchildren share the `P` prefix but are excluded; the one-segment
//! check compares separator counts. Siblings, ancestors and nodes of other
//! tenants are never in scope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hierarchy_core::path::separator_count;
use hierarchy_core::{HierarchyError, HierarchyResult, Node, TreePath};

use crate::caller::Caller;

/// Predicate selecting the nodes a caller is authorized for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AccessScope {
    /// Every node of the tenant.
    Tenant {
        /// Tenant in scope.
        tenant_id: Uuid,
    },

    /// A node and its direct children.
    SelfAndChildren {
        /// Tenant of the node.
        tenant_id: Uuid,
        /// The node itself.
        node_id: Uuid,
        /// Level of the node.
        level: u32,
        /// Path of the node.
        path: TreePath,
    },
}

/// Build the scope predicate for `caller`.
///
/// # Example
///
/// ```
/// use hierarchy_access::{authorized_scope, AccessScope, Caller};
/// use uuid::Uuid;
///
/// let tenant_id = Uuid::now_v7();
/// let scope = authorized_scope(&Caller::TenantRoot { tenant_id });
/// assert_eq!(scope, AccessScope::Tenant { tenant_id });
/// ```
pub fn authorized_scope(caller: &Caller) -> AccessScope {
    match caller {
        Caller::TenantRoot { tenant_id } => AccessScope::Tenant {
            tenant_id: *tenant_id,
        },
        Caller::HierarchyNode {
            tenant_id,
            node_id,
            level,
            path,
        } => AccessScope::SelfAndChildren {
            tenant_id: *tenant_id,
            node_id: *node_id,
            level: *level,
            path: path.clone(),
        },
    }
}

impl AccessScope {
    /// Tenant the scope is confined to.
    pub fn tenant_id(&self) -> Uuid {
        match self {
            AccessScope::Tenant { tenant_id } | AccessScope::SelfAndChildren { tenant_id, .. } => {
                *tenant_id
            }
        }
    }

    /// Whether `node` is in scope.
    pub fn contains(&self, node: &Node) -> bool {
        self.contains_parts(node.tenant_id, node.level, node.path.as_str())
    }

    /// Whether a node with the given tenant, level and path is in scope.
    ///
    /// Works on raw columns so a storage collaborator can apply the same
    /// rule to rows it has not materialized into [`Node`]s.
    pub fn contains_parts(&self, tenant_id: Uuid, level: u32, path: &str) -> bool {
        match self {
            AccessScope::Tenant { tenant_id: scope_tenant } => *scope_tenant == tenant_id,
            AccessScope::SelfAndChildren {
                tenant_id: scope_tenant,
                level: scope_level,
                path: scope_path,
                ..
            } => {
                if *scope_tenant != tenant_id {
                    return false;
                }
                let own = scope_path.as_str();
                if path == own {
                    return true;
                }
                path.starts_with(own)
                    && separator_count(path) == separator_count(own) + 1
                    && level == scope_level + 1
            }
        }
    }

    /// Keep only the nodes in scope.
    pub fn filter(&self, nodes: impl IntoIterator<Item = Node>) -> Vec<Node> {
        nodes.into_iter().filter(|n| self.contains(n)).collect()
    }

    /// Fail with `Unauthorized` unless `node` is in scope.
    pub fn require(&self, node: &Node) -> HierarchyResult<()> {
        if self.contains(node) {
            Ok(())
        } else {
            tracing::debug!(node_id = %node.id, tenant_id = %node.tenant_id, "Node outside caller scope");
            Err(HierarchyError::Unauthorized(format!(
                "node {} is outside the caller's scope",
                node.full_account_number()
            )))
        }
    }

    /// Whether the caller may create a node under `parent`
    /// (`None` means attached directly to the tenant root).
    ///
    /// A tenant root may create anywhere in its tenant; a hierarchy node
    /// only directly beneath itself.
    pub fn can_create_under(&self, parent: Option<&Node>) -> bool {
        match (self, parent) {
            (AccessScope::Tenant { .. }, None) => true,
            (AccessScope::Tenant { tenant_id }, Some(parent)) => parent.tenant_id == *tenant_id,
            (AccessScope::SelfAndChildren { .. }, None) => false,
            (
                AccessScope::SelfAndChildren {
                    tenant_id, node_id, ..
                },
                Some(parent),
            ) => parent.id == *node_id && parent.tenant_id == *tenant_id,
        }
    }

    /// Fail with `Unauthorized` unless [`AccessScope::can_create_under`] holds.
    pub fn require_create_under(&self, parent: Option<&Node>) -> HierarchyResult<()> {
        if self.can_create_under(parent) {
            return Ok(());
        }
        let target = match parent {
            Some(parent) => parent.full_account_number(),
            None => "the tenant root".to_string(),
        };
        Err(HierarchyError::Unauthorized(format!(
            "caller may not create nodes under {}",
            target
        )))
    }
}
