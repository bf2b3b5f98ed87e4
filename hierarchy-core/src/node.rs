//! Hierarchy node domain model
//!
//! Nodes hang below a tenant root. A node at level `L` is either attached
//! directly to the tenant root (`L == 1`) or to a node at level `L - 1` of
//! the same tenant. The tree path is materialized at creation time and never
//! recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountNumber;
use crate::hierarchical_id::HierarchicalId;
use crate::path::TreePath;

/// A non-root member of a tenant hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: Uuid,

    /// Owning tenant root
    pub tenant_id: Uuid,

    /// Parent node, `None` when attached directly to the tenant root
    pub parent_id: Option<Uuid>,

    /// Account number of the owning tenant root, captured at creation
    pub tenant_account_number: AccountNumber,

    /// Identifier unique within `(tenant, level)`
    pub hierarchical_id: HierarchicalId,

    /// Depth below the tenant root (1-based)
    pub level: u32,

    /// Materialized ancestry path
    pub path: TreePath,

    /// Company and contact details
    pub profile: NodeProfile,

    /// One-way hash of the sign-in secret
    #[serde(skip_serializing, default)]
    pub credential_hash: String,

    /// Whether the credential is still the generated initial one
    pub uses_initial_credential: bool,

    /// Lifecycle status
    pub status: NodeStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Whether the node is attached directly to the tenant root.
    pub fn is_root_attached(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the node may sign in and act.
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Display form `"{tenant account}-{hierarchical id}"`, e.g. `2412161700-L2-001`.
    pub fn full_account_number(&self) -> String {
        format!("{}-{}", self.tenant_account_number, self.hierarchical_id)
    }

    /// Level that children of this node are created at.
    pub fn direct_child_level(&self) -> u32 {
        self.level + 1
    }
}

/// Company and contact details of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProfile {
    /// Company or site name
    pub company_name: String,

    /// Contact email, unique across nodes when present
    pub email: Option<String>,

    /// Name of the contact person
    pub contact_person: Option<String>,

    /// Contact phone number
    pub phone: Option<String>,

    /// Postal address
    pub address: Option<String>,

    /// Identifier in an external system (e.g. a business registration
    /// number), unique across nodes when present
    pub external_id: Option<String>,
}

impl NodeProfile {
    /// Profile with only a company name.
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    /// Set the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the external identifier.
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Set the contact person.
    pub fn with_contact_person(mut self, name: impl Into<String>) -> Self {
        self.contact_person = Some(name.into());
        self
    }
}

/// Partial update of a node profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name; must not be blank
    pub company_name: Option<String>,

    /// New contact person
    pub contact_person: Option<String>,

    /// New phone number
    pub phone: Option<String>,

    /// New postal address
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// Apply the update to `profile`.
    pub fn apply_to(&self, profile: &mut NodeProfile) {
        if let Some(name) = &self.company_name {
            profile.company_name = name.clone();
        }
        if let Some(contact) = &self.contact_person {
            profile.contact_person = Some(contact.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.company_name.is_none()
            && self.contact_person.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

/// Node lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Operating normally
    Active,

    /// Deactivated, cannot sign in
    Inactive,

    /// Suspended by an administrator
    Suspended,
}

impl NodeStatus {
    /// Get the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::Inactive => "inactive",
            NodeStatus::Suspended => "suspended",
        }
    }

    /// Parse status from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(NodeStatus::Active),
            "inactive" => Some(NodeStatus::Inactive),
            "suspended" => Some(NodeStatus::Suspended),
            _ => None,
        }
    }
}

/// A node as handed to storage before its path is known.
///
/// Storage assigns the UUID and enforces uniqueness of the hierarchical id
/// within `(tenant, level)`, of the email and of the external id. The path
/// is written afterwards with [`crate::store::NodeStore::finalize_path`].
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub tenant_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub tenant_account_number: AccountNumber,
    pub hierarchical_id: HierarchicalId,
    pub level: u32,
    pub profile: NodeProfile,
    pub credential_hash: String,
}

impl NodeDraft {
    /// Turn the draft into a full node once storage has assigned an id and
    /// the path is known.
    pub fn into_node(self, id: Uuid, path: TreePath) -> Node {
        let now = Utc::now();
        Node {
            id,
            tenant_id: self.tenant_id,
            parent_id: self.parent_id,
            tenant_account_number: self.tenant_account_number,
            hierarchical_id: self.hierarchical_id,
            level: self.level,
            path,
            profile: self.profile,
            credential_hash: self.credential_hash,
            uses_initial_credential: true,
            status: NodeStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
