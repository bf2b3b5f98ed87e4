//! In-memory storage backend
//!
//! Suitable for single-process deployments and testing. Unique indexes are
//! checked and written under one write lock, so concurrent inserts racing
//! on the same hierarchical id are serialized exactly as a relational
//! unique index would serialize them.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::hierarchical_id::HierarchicalId;
use crate::node::{Node, NodeDraft, NodeStatus, ProfileUpdate};
use crate::path::TreePath;
use crate::store::{NodeStore, StoreError, StoreResult, TenantStore, UniqueConstraint};
use crate::tenant::{TenantRoot, TenantStatus};

/// A node row, with or without its final path.
#[derive(Debug, Clone)]
enum NodeRecord {
    Pending { id: Uuid, draft: NodeDraft },
    Finalized(Node),
}

impl NodeRecord {
    fn tenant_id(&self) -> Uuid {
        match self {
            NodeRecord::Pending { draft, .. } => draft.tenant_id,
            NodeRecord::Finalized(node) => node.tenant_id,
        }
    }

    fn level(&self) -> u32 {
        match self {
            NodeRecord::Pending { draft, .. } => draft.level,
            NodeRecord::Finalized(node) => node.level,
        }
    }

    fn hierarchical_id(&self) -> HierarchicalId {
        match self {
            NodeRecord::Pending { draft, .. } => draft.hierarchical_id,
            NodeRecord::Finalized(node) => node.hierarchical_id,
        }
    }

    fn email(&self) -> Option<&str> {
        match self {
            NodeRecord::Pending { draft, .. } => draft.profile.email.as_deref(),
            NodeRecord::Finalized(node) => node.profile.email.as_deref(),
        }
    }

    fn external_id(&self) -> Option<&str> {
        match self {
            NodeRecord::Pending { draft, .. } => draft.profile.external_id.as_deref(),
            NodeRecord::Finalized(node) => node.profile.external_id.as_deref(),
        }
    }

    fn visible(&self) -> Option<&Node> {
        match self {
            NodeRecord::Pending { .. } => None,
            NodeRecord::Finalized(node) => Some(node),
        }
    }

    fn visible_mut(&mut self) -> Option<&mut Node> {
        match self {
            NodeRecord::Pending { .. } => None,
            NodeRecord::Finalized(node) => Some(node),
        }
    }
}

/// In-memory implementation of [`TenantStore`] and [`NodeStore`].
///
/// Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<RwLock<HashMap<Uuid, TenantRoot>>>,
    nodes: Arc<RwLock<HashMap<Uuid, NodeRecord>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tenant roots.
    pub async fn tenant_count(&self) -> usize {
        self.tenants.read().await.len()
    }

    /// Number of node rows, pending ones included.
    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    async fn collect_nodes<F>(&self, predicate: F) -> Vec<Node>
    where
        F: Fn(&Node) -> bool,
    {
        let nodes = self.nodes.read().await;
        let mut found: Vec<Node> = nodes
            .values()
            .filter_map(NodeRecord::visible)
            .filter(|node| predicate(node))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        found
    }

    async fn modify_node<F>(&self, id: Uuid, apply: F) -> StoreResult<Node>
    where
        F: FnOnce(&mut Node),
    {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&id)
            .and_then(NodeRecord::visible_mut)
            .ok_or(StoreError::NotFound)?;
        apply(node);
        node.updated_at = Utc::now();
        Ok(node.clone())
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn insert_tenant(&self, tenant: TenantRoot) -> StoreResult<()> {
        let mut tenants = self.tenants.write().await;

        for existing in tenants.values() {
            if same_email(&existing.profile.email, &tenant.profile.email) {
                return Err(StoreError::Duplicate(UniqueConstraint::TenantEmail));
            }
            if existing.account_number == tenant.account_number {
                return Err(StoreError::Duplicate(UniqueConstraint::AccountNumber));
            }
        }

        tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn update_tenant_status(&self, id: Uuid, status: TenantStatus) -> StoreResult<TenantRoot> {
        let mut tenants = self.tenants.write().await;
        let tenant = tenants.get_mut(&id).ok_or(StoreError::NotFound)?;
        tenant.status = status;
        tenant.updated_at = Utc::now();
        Ok(tenant.clone())
    }

    async fn find_tenant(&self, id: Uuid) -> StoreResult<Option<TenantRoot>> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }

    async fn find_tenant_by_email(&self, email: &str) -> StoreResult<Option<TenantRoot>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .values()
            .find(|t| same_email(&t.profile.email, email))
            .cloned())
    }

    async fn find_tenant_by_account_number(&self, number: &str) -> StoreResult<Option<TenantRoot>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .values()
            .find(|t| t.account_number.as_str() == number)
            .cloned())
    }

    async fn exists_by_account_number(&self, number: &str) -> StoreResult<bool> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().any(|t| t.account_number.as_str() == number))
    }

    async fn exists_tenant_email(&self, email: &str) -> StoreResult<bool> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().any(|t| same_email(&t.profile.email, email)))
    }

    async fn count_account_numbers_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .values()
            .filter(|t| t.account_number.as_str().starts_with(prefix))
            .count() as u64)
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn insert_node(&self, draft: NodeDraft) -> StoreResult<Uuid> {
        let mut nodes = self.nodes.write().await;

        for existing in nodes.values() {
            if existing.tenant_id() == draft.tenant_id
                && existing.level() == draft.level
                && existing.hierarchical_id() == draft.hierarchical_id
            {
                return Err(StoreError::Duplicate(UniqueConstraint::HierarchicalId));
            }
            if let (Some(a), Some(b)) = (existing.email(), draft.profile.email.as_deref()) {
                if same_email(a, b) {
                    return Err(StoreError::Duplicate(UniqueConstraint::NodeEmail));
                }
            }
            if let (Some(a), Some(b)) = (existing.external_id(), draft.profile.external_id.as_deref()) {
                if a == b {
                    return Err(StoreError::Duplicate(UniqueConstraint::ExternalId));
                }
            }
        }

        let id = Uuid::now_v7();
        nodes.insert(id, NodeRecord::Pending { id, draft });
        Ok(id)
    }

    async fn finalize_path(&self, id: Uuid, path: TreePath) -> StoreResult<Node> {
        let mut nodes = self.nodes.write().await;
        let record = nodes.remove(&id).ok_or(StoreError::NotFound)?;

        match record {
            NodeRecord::Pending { id, draft } => {
                let node = draft.into_node(id, path);
                nodes.insert(id, NodeRecord::Finalized(node.clone()));
                Ok(node)
            }
            finalized @ NodeRecord::Finalized(_) => {
                nodes.insert(id, finalized);
                Err(StoreError::Backend(format!("path of node {} is already final", id)))
            }
        }
    }

    async fn discard_pending(&self, id: Uuid) -> StoreResult<bool> {
        let mut nodes = self.nodes.write().await;
        match nodes.get(&id) {
            Some(NodeRecord::Pending { .. }) => {
                nodes.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_initial_credential(&self, id: Uuid, credential_hash: String) -> StoreResult<bool> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&id)
            .and_then(NodeRecord::visible_mut)
            .ok_or(StoreError::NotFound)?;

        if !node.uses_initial_credential {
            return Ok(false);
        }
        node.credential_hash = credential_hash;
        node.uses_initial_credential = false;
        node.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_credential(&self, id: Uuid, credential_hash: String) -> StoreResult<()> {
        self.modify_node(id, |node| {
            node.credential_hash = credential_hash;
            node.uses_initial_credential = false;
        })
        .await
        .map(|_| ())
    }

    async fn update_node_status(&self, id: Uuid, status: NodeStatus) -> StoreResult<Node> {
        self.modify_node(id, |node| node.status = status).await
    }

    async fn update_node_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Node> {
        self.modify_node(id, |node| update.apply_to(&mut node.profile))
            .await
    }

    async fn find_node(&self, id: Uuid) -> StoreResult<Option<Node>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(&id).and_then(NodeRecord::visible).cloned())
    }

    async fn find_node_by_hierarchical_id(
        &self,
        tenant_id: Uuid,
        id: &HierarchicalId,
    ) -> StoreResult<Option<Node>> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .filter_map(NodeRecord::visible)
            .find(|n| n.tenant_id == tenant_id && n.hierarchical_id == *id)
            .cloned())
    }

    async fn find_children_of(&self, parent_id: Uuid) -> StoreResult<Vec<Node>> {
        Ok(self
            .collect_nodes(|n| n.parent_id == Some(parent_id))
            .await)
    }

    async fn find_root_attached(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>> {
        Ok(self
            .collect_nodes(|n| n.tenant_id == tenant_id && n.parent_id.is_none())
            .await)
    }

    async fn find_in_tenant(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>> {
        Ok(self.collect_nodes(|n| n.tenant_id == tenant_id).await)
    }

    async fn find_by_path_prefix(&self, prefix: &TreePath) -> StoreResult<Vec<Node>> {
        Ok(self
            .collect_nodes(|n| n.path.is_descendant_of(prefix))
            .await)
    }

    async fn find_using_initial_credential(&self, tenant_id: Uuid) -> StoreResult<Vec<Node>> {
        Ok(self
            .collect_nodes(|n| n.tenant_id == tenant_id && n.uses_initial_credential)
            .await)
    }

    async fn exists_by_identifier(
        &self,
        tenant_id: Uuid,
        level: u32,
        id: &HierarchicalId,
    ) -> StoreResult<bool> {
        let nodes = self.nodes.read().await;
        Ok(nodes.values().any(|r| {
            r.tenant_id() == tenant_id && r.level() == level && r.hierarchical_id() == *id
        }))
    }

    async fn exists_node_email(&self, email: &str) -> StoreResult<bool> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .any(|r| r.email().map(|e| same_email(e, email)).unwrap_or(false)))
    }

    async fn exists_external_id(&self, external_id: &str) -> StoreResult<bool> {
        let nodes = self.nodes.read().await;
        Ok(nodes.values().any(|r| r.external_id() == Some(external_id)))
    }

    async fn count_at_level(&self, tenant_id: Uuid, level: u32) -> StoreResult<u64> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .filter(|r| r.tenant_id() == tenant_id && r.level() == level)
            .count() as u64)
    }
}
