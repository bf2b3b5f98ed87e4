//! Node lifecycle
//!
//! Orchestrates node creation and the few mutations a node allows after
//! that. Creation runs in this order:
//!
//! 1. reject duplicate email or external id with `Conflict`, before any
//!    allocation is attempted
//! 2. resolve the parent (none means attached to the tenant root, level 1);
//!    a missing or cross-tenant parent is an `InvalidParent`
//! 3. compute the level and allocate a hierarchical id for `(tenant, level)`
//! 4. hash the hierarchical id itself as the initial credential
//! 5. persist the node without a path; a storage duplicate on the
//!    hierarchical id sends us back to step 3
//! 6. once the node's identity is durable, write its final path; if that
//!    write fails the pending node is discarded and the error returned
//!
//! Parent, level, tenant, hierarchical id and path never change after
//! creation, and nodes are never deleted.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::HierarchyConfig;
use crate::credential::{CredentialHasher, PasswordPolicy};
use crate::error::{HierarchyError, HierarchyResult};
use crate::hierarchical_id::{HierarchicalId, HierarchicalIdAllocator};
use crate::node::{Node, NodeDraft, NodeProfile, NodeStatus, ProfileUpdate};
use crate::path::TreePath;
use crate::store::{NodeStore, StoreError, TenantStore, UniqueConstraint};

/// Creates and maintains hierarchy nodes.
pub struct NodeLifecycle {
    nodes: Arc<dyn NodeStore>,
    tenants: Arc<dyn TenantStore>,
    hasher: Arc<dyn CredentialHasher>,
    allocator: HierarchicalIdAllocator,
    policy: PasswordPolicy,
    max_attempts: u32,
}

impl NodeLifecycle {
    /// Create a lifecycle over the given collaborators.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        tenants: Arc<dyn TenantStore>,
        hasher: Arc<dyn CredentialHasher>,
        config: &HierarchyConfig,
    ) -> Self {
        Self {
            nodes,
            tenants,
            hasher,
            allocator: HierarchicalIdAllocator::new(config.max_allocation_attempts),
            policy: PasswordPolicy::default(),
            max_attempts: config.max_allocation_attempts.max(1),
        }
    }

    /// Replace the password policy applied to chosen credentials.
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a node under `parent_id`, or directly under the tenant root
    /// when `parent_id` is `None`.
    ///
    /// The returned node signs in with `"{account}-{hierarchical id}"` and
    /// its hierarchical id as the initial secret.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` for an empty company name
    /// - `Conflict` for a duplicate email or external id
    /// - `NotFound` for an unknown tenant
    /// - `InvalidParent` for a missing or cross-tenant parent
    /// - `CapacityExceeded` when no hierarchical id could be allocated
    pub async fn create(
        &self,
        tenant_id: Uuid,
        parent_id: Option<Uuid>,
        profile: NodeProfile,
    ) -> HierarchyResult<Node> {
        if profile.company_name.trim().is_empty() {
            return Err(HierarchyError::invalid_format("company name", ""));
        }
        self.ensure_unique_contact(&profile).await?;

        let tenant = self
            .tenants
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| HierarchyError::tenant_not_found(tenant_id))?;

        let parent = match parent_id {
            None => None,
            Some(parent_id) => Some(self.resolve_parent(tenant_id, parent_id).await?),
        };
        let level = parent.as_ref().map(Node::direct_child_level).unwrap_or(1);

        let mut attempt = 0;
        let (id, hierarchical_id) = loop {
            attempt += 1;
            if attempt > self.max_attempts {
                return Err(HierarchyError::CapacityExceeded {
                    scope: format!("tenant {} level {}", tenant_id, level),
                    attempted: format!("L{}", level),
                    reason: format!("{} insert attempts lost to concurrent creation", self.max_attempts),
                });
            }

            let hierarchical_id = self
                .allocator
                .allocate(self.nodes.as_ref(), tenant_id, level)
                .await?;
            let credential_hash = self.hasher.hash(&hierarchical_id.to_string()).await?;

            let draft = NodeDraft {
                tenant_id,
                parent_id,
                tenant_account_number: tenant.account_number.clone(),
                hierarchical_id,
                level,
                profile: profile.clone(),
                credential_hash,
            };

            match self.nodes.insert_node(draft).await {
                Ok(id) => break (id, hierarchical_id),
                Err(StoreError::Duplicate(UniqueConstraint::HierarchicalId)) => {
                    tracing::warn!(
                        %tenant_id,
                        level,
                        attempt,
                        hierarchical_id = %hierarchical_id,
                        "Hierarchical id taken on insert, reallocating"
                    );
                }
                Err(StoreError::Duplicate(constraint)) => {
                    return Err(conflict_for(constraint, &profile));
                }
                Err(e) => return Err(e.into()),
            }
        };

        let path = match &parent {
            None => TreePath::for_root_attached(&tenant.account_number, &hierarchical_id),
            Some(parent) => TreePath::for_child(&parent.path, &hierarchical_id),
        };
        let node = match self.nodes.finalize_path(id, path).await {
            Ok(node) => node,
            Err(e) => {
                self.discard_unfinished(id, tenant_id, &hierarchical_id).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            %tenant_id,
            node_id = %node.id,
            level,
            hierarchical_id = %node.hierarchical_id,
            path = %node.path,
            outcome = "created",
            "Hierarchy node created"
        );

        Ok(node)
    }

    /// Replace the generated initial credential with a chosen secret.
    ///
    /// Succeeds once per node. Every later call fails with
    /// `InitialCredentialConsumed`; use [`NodeLifecycle::change_credential`]
    /// for ordinary changes.
    pub async fn change_initial_credential(
        &self,
        node_id: Uuid,
        new_secret: &str,
    ) -> HierarchyResult<()> {
        let node = self.find(node_id).await?;
        if !node.uses_initial_credential {
            return Err(HierarchyError::InitialCredentialConsumed { node_id });
        }
        self.policy.validate(new_secret)?;

        let hash = self.hasher.hash(new_secret).await?;
        let replaced = self
            .nodes
            .replace_initial_credential(node_id, hash)
            .await
            .map_err(|e| missing_node(e, node_id))?;

        // Lost a race against a concurrent first change.
        if !replaced {
            return Err(HierarchyError::InitialCredentialConsumed { node_id });
        }

        tracing::info!(%node_id, tenant_id = %node.tenant_id, outcome = "replaced", "Initial credential replaced");
        Ok(())
    }

    /// Change the credential after verifying the current one.
    pub async fn change_credential(
        &self,
        node_id: Uuid,
        current_secret: &str,
        new_secret: &str,
    ) -> HierarchyResult<()> {
        let node = self.find(node_id).await?;
        if !self.hasher.verify(current_secret, &node.credential_hash).await? {
            tracing::warn!(%node_id, outcome = "wrong_secret", "Credential change rejected");
            return Err(HierarchyError::InvalidCredentials);
        }
        self.policy.validate(new_secret)?;

        let hash = self.hasher.hash(new_secret).await?;
        self.nodes
            .set_credential(node_id, hash)
            .await
            .map_err(|e| missing_node(e, node_id))?;

        tracing::info!(%node_id, tenant_id = %node.tenant_id, outcome = "changed", "Credential changed");
        Ok(())
    }

    /// Activate, deactivate or suspend a node.
    pub async fn change_status(&self, node_id: Uuid, status: NodeStatus) -> HierarchyResult<Node> {
        let node = self
            .nodes
            .update_node_status(node_id, status)
            .await
            .map_err(|e| missing_node(e, node_id))?;

        tracing::info!(%node_id, status = status.as_str(), "Node status changed");
        Ok(node)
    }

    /// Update contact details. Structural fields are not touched.
    pub async fn update_profile(&self, node_id: Uuid, update: ProfileUpdate) -> HierarchyResult<Node> {
        if update.is_empty() {
            return self.find(node_id).await;
        }
        if matches!(&update.company_name, Some(name) if name.trim().is_empty()) {
            return Err(HierarchyError::invalid_format("company name", ""));
        }

        self.nodes
            .update_node_profile(node_id, update)
            .await
            .map_err(|e| missing_node(e, node_id))
    }

    /// Find a node by id.
    pub async fn find(&self, node_id: Uuid) -> HierarchyResult<Node> {
        self.nodes
            .find_node(node_id)
            .await?
            .ok_or_else(|| HierarchyError::node_not_found(node_id))
    }

    /// Level-1 nodes of a tenant.
    pub async fn root_attached(&self, tenant_id: Uuid) -> HierarchyResult<Vec<Node>> {
        Ok(self.nodes.find_root_attached(tenant_id).await?)
    }

    /// Direct children of a node.
    pub async fn children_of(&self, parent_id: Uuid) -> HierarchyResult<Vec<Node>> {
        Ok(self.nodes.find_children_of(parent_id).await?)
    }

    /// A node and all of its descendants, selected by path prefix.
    pub async fn subtree(&self, node_id: Uuid) -> HierarchyResult<Vec<Node>> {
        let node = self.find(node_id).await?;
        Ok(self.nodes.find_by_path_prefix(&node.path).await?)
    }

    /// Nodes of a tenant that have never changed their initial credential.
    pub async fn awaiting_credential_change(&self, tenant_id: Uuid) -> HierarchyResult<Vec<Node>> {
        Ok(self.nodes.find_using_initial_credential(tenant_id).await?)
    }

    /// Drop a node whose path write failed so its identifiers can be reused.
    async fn discard_unfinished(&self, id: Uuid, tenant_id: Uuid, hierarchical_id: &HierarchicalId) {
        match self.nodes.discard_pending(id).await {
            Ok(_) => tracing::warn!(
                %tenant_id,
                node_id = %id,
                hierarchical_id = %hierarchical_id,
                outcome = "discarded",
                "Path write failed, pending node discarded"
            ),
            Err(e) => tracing::error!(
                %tenant_id,
                node_id = %id,
                hierarchical_id = %hierarchical_id,
                error = %e,
                "Path write failed and pending node could not be discarded"
            ),
        }
    }

    async fn ensure_unique_contact(&self, profile: &NodeProfile) -> HierarchyResult<()> {
        if let Some(email) = &profile.email {
            if self.nodes.exists_node_email(email).await? {
                return Err(HierarchyError::Conflict {
                    field: "email",
                    value: email.clone(),
                });
            }
        }
        if let Some(external_id) = &profile.external_id {
            if self.nodes.exists_external_id(external_id).await? {
                return Err(HierarchyError::Conflict {
                    field: "external_id",
                    value: external_id.clone(),
                });
            }
        }
        Ok(())
    }

    async fn resolve_parent(&self, tenant_id: Uuid, parent_id: Uuid) -> HierarchyResult<Node> {
        let parent = self.nodes.find_node(parent_id).await?.ok_or_else(|| {
            HierarchyError::InvalidParent {
                tenant_id,
                parent_id,
                reason: "parent does not exist".to_string(),
            }
        })?;

        if parent.tenant_id != tenant_id {
            return Err(HierarchyError::InvalidParent {
                tenant_id,
                parent_id,
                reason: format!("parent belongs to tenant {}", parent.tenant_id),
            });
        }
        Ok(parent)
    }
}

fn conflict_for(constraint: UniqueConstraint, profile: &NodeProfile) -> HierarchyError {
    let value = match constraint {
        UniqueConstraint::NodeEmail | UniqueConstraint::TenantEmail => profile.email.clone(),
        UniqueConstraint::ExternalId => profile.external_id.clone(),
        _ => None,
    };
    HierarchyError::Conflict {
        field: constraint.field(),
        value: value.unwrap_or_default(),
    }
}

fn missing_node(error: StoreError, node_id: Uuid) -> HierarchyError {
    match error {
        StoreError::NotFound => HierarchyError::node_not_found(node_id),
        other => other.into(),
    }
}
