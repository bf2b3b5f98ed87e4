//! # Scope Resolver
//!
//! Loads a caller's authorized node set from storage. A hierarchy node's
//! set is fetched with one path-prefix query and narrowed in memory with
//! the [`AccessScope`] predicate, so no recursive traversal is needed.

use std::sync::Arc;
use uuid::Uuid;

use hierarchy_core::{HierarchyError, HierarchyResult, Node, NodeStore};

use crate::caller::Caller;
use crate::scope::{authorized_scope, AccessScope};

/// Resolves authorized node sets against a [`NodeStore`].
pub struct ScopeResolver {
    nodes: Arc<dyn NodeStore>,
}

impl ScopeResolver {
    /// Create a resolver over `nodes`.
    pub fn new(nodes: Arc<dyn NodeStore>) -> Self {
        Self { nodes }
    }

    /// Every node `caller` may view or manage.
    ///
    /// For a hierarchy node the result is never empty: it always contains
    /// the node itself.
    pub async fn accessible_nodes(&self, caller: &Caller) -> HierarchyResult<Vec<Node>> {
        let scope = authorized_scope(caller);

        let candidates = match &scope {
            AccessScope::Tenant { tenant_id } => self.nodes.find_in_tenant(*tenant_id).await?,
            AccessScope::SelfAndChildren { path, .. } => {
                self.nodes.find_by_path_prefix(path).await?
            }
        };
        let visible = scope.filter(candidates);

        tracing::debug!(
            tenant_id = %caller.tenant_id(),
            caller = caller.kind().as_str(),
            visible = visible.len(),
            "Resolved accessible nodes"
        );
        Ok(visible)
    }

    /// Load `node_id` and check it is in `caller`'s scope.
    ///
    /// A node of another tenant is reported as `Unauthorized`, not
    /// `NotFound`, so callers cannot probe foreign ids.
    pub async fn authorize(&self, caller: &Caller, node_id: Uuid) -> HierarchyResult<Node> {
        let node = self
            .nodes
            .find_node(node_id)
            .await?
            .ok_or_else(|| HierarchyError::node_not_found(node_id))?;

        if node.tenant_id != caller.tenant_id() {
            return Err(HierarchyError::Unauthorized(format!(
                "node {} belongs to another tenant",
                node_id
            )));
        }
        authorized_scope(caller).require(&node)?;
        Ok(node)
    }

    /// Check `caller` may create a node under `parent_id`.
    pub async fn authorize_create(
        &self,
        caller: &Caller,
        parent_id: Option<Uuid>,
    ) -> HierarchyResult<()> {
        let parent = match parent_id {
            None => None,
            Some(id) => Some(
                self.nodes
                    .find_node(id)
                    .await?
                    .ok_or_else(|| HierarchyError::node_not_found(id))?,
            ),
        };
        authorized_scope(caller).require_create_under(parent.as_ref())
    }
}
