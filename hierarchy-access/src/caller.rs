//! # Callers
//!
//! The authenticated party on whose behalf an operation runs. A caller is
//! either a tenant root or a hierarchy node; scope evaluation dispatches on
//! this closed variant instead of comparing type strings at call sites.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hierarchy_core::{Node, TenantRoot, TreePath};

/// Kind of caller, as carried in token claims.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallerKind {
    /// Top-level owner of a hierarchy.
    TenantRoot,

    /// Any node below the tenant root.
    HierarchyNode,
}

impl CallerKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerKind::TenantRoot => "tenant_root",
            CallerKind::HierarchyNode => "hierarchy_node",
        }
    }

    /// Parse the kind from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tenant_root" => Some(CallerKind::TenantRoot),
            "hierarchy_node" => Some(CallerKind::HierarchyNode),
            _ => None,
        }
    }
}

/// The caller of an operation.
///
/// # Example
///
/// ```
/// use hierarchy_access::{Caller, CallerKind};
/// use hierarchy_core::TreePath;
/// use uuid::Uuid;
///
/// let caller = Caller::HierarchyNode {
///     tenant_id: Uuid::now_v7(),
///     node_id: Uuid::now_v7(),
///     level: 1,
///     path: TreePath::parse("/2412161700/L1-001/").unwrap(),
/// };
/// assert_eq!(caller.kind(), CallerKind::HierarchyNode);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Caller {
    /// The tenant root itself.
    TenantRoot {
        /// Tenant the caller owns.
        tenant_id: Uuid,
    },

    /// A hierarchy node.
    HierarchyNode {
        /// Tenant the node belongs to.
        tenant_id: Uuid,
        /// The node's id.
        node_id: Uuid,
        /// The node's level.
        level: u32,
        /// The node's materialized path.
        path: TreePath,
    },
}

impl Caller {
    /// Caller acting as `tenant`.
    pub fn for_tenant(tenant: &TenantRoot) -> Self {
        Caller::TenantRoot {
            tenant_id: tenant.id,
        }
    }

    /// Caller acting as `node`.
    pub fn for_node(node: &Node) -> Self {
        Caller::HierarchyNode {
            tenant_id: node.tenant_id,
            node_id: node.id,
            level: node.level,
            path: node.path.clone(),
        }
    }

    /// Tenant the caller acts within.
    pub fn tenant_id(&self) -> Uuid {
        match self {
            Caller::TenantRoot { tenant_id } | Caller::HierarchyNode { tenant_id, .. } => {
                *tenant_id
            }
        }
    }

    /// Node id of a hierarchy-node caller.
    pub fn node_id(&self) -> Option<Uuid> {
        match self {
            Caller::TenantRoot { .. } => None,
            Caller::HierarchyNode { node_id, .. } => Some(*node_id),
        }
    }

    /// The caller's kind.
    pub fn kind(&self) -> CallerKind {
        match self {
            Caller::TenantRoot { .. } => CallerKind::TenantRoot,
            Caller::HierarchyNode { .. } => CallerKind::HierarchyNode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(CallerKind::parse("tenant_root"), Some(CallerKind::TenantRoot));
        assert_eq!(CallerKind::parse("HIERARCHY_NODE"), Some(CallerKind::HierarchyNode));
        assert_eq!(CallerKind::parse("admin"), None);
        assert_eq!(CallerKind::HierarchyNode.as_str(), "hierarchy_node");
    }

    #[test]
    fn test_accessors() {
        let tenant_id = Uuid::now_v7();
        let root = Caller::TenantRoot { tenant_id };
        assert_eq!(root.tenant_id(), tenant_id);
        assert_eq!(root.node_id(), None);
        assert_eq!(root.kind(), CallerKind::TenantRoot);

        let node_id = Uuid::now_v7();
        let node = Caller::HierarchyNode {
            tenant_id,
            node_id,
            level: 2,
            path: TreePath::parse("/2412161700/L1-001/L2-001/").unwrap(),
        };
        assert_eq!(node.tenant_id(), tenant_id);
        assert_eq!(node.node_id(), Some(node_id));
    }

    #[test]
    fn test_serde_tagging() {
        let caller = Caller::TenantRoot {
            tenant_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&caller).unwrap();
        assert_eq!(json["type"], "tenant_root");
        let back: Caller = serde_json::from_value(json).unwrap();
        assert_eq!(back, caller);
    }
}
