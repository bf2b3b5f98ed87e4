//! Token claims carrying a caller's hierarchy position
//!
//! The claim bag holds everything scope evaluation needs (tenant id, node
//! id, level, path and caller kind) so a request can be authorized without
//! loading the caller from storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hierarchy_access::{Caller, CallerKind};
use hierarchy_core::{HierarchyError, Node, TenantRoot, TreePath};

use crate::error::{AuthError, AuthResult};

/// Default issuer stamped on claims before a signer overrides it.
pub const DEFAULT_ISSUER: &str = "tenant-hierarchy";

/// Standard JWT claims extended with the caller's hierarchy position.
///
/// # Example
///
/// ```rust,no_run
/// use hierarchy_auth::claims::ScopeClaims;
/// # fn example(node: &hierarchy_core::Node) -> hierarchy_auth::AuthResult<()> {
/// let claims = ScopeClaims::for_node(node);
/// let caller = claims.to_caller()?;
/// assert_eq!(caller.node_id(), Some(node.id));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeClaims {
    // Standard JWT claims (RFC 7519)
    /// Subject (tenant id for a tenant root, node id for a hierarchy node)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID
    pub jti: String,

    // Hierarchy claims
    /// Tenant the caller acts within
    pub tenant_id: Uuid,

    /// Node id, hierarchy nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Uuid>,

    /// Node level, hierarchy nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Node path, hierarchy nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Caller kind
    pub node_type: CallerKind,

    /// Display account number (`2412161700` or `2412161700-L1-001`)
    pub account_number: String,

    /// Company name for display
    pub company_name: String,

    /// Whether the caller still signs in with a generated credential
    #[serde(default)]
    pub must_change_credential: bool,

    /// Token type
    #[serde(default)]
    pub token_type: TokenType,
}

impl ScopeClaims {
    fn base(sub: Uuid, tenant_id: Uuid, node_type: CallerKind) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.to_string(),
            iss: DEFAULT_ISSUER.to_string(),
            aud: Vec::new(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            tenant_id,
            node_id: None,
            level: None,
            path: None,
            node_type,
            account_number: String::new(),
            company_name: String::new(),
            must_change_credential: false,
            token_type: TokenType::Access,
        }
    }

    /// Claims for a tenant-root caller.
    pub fn for_tenant(tenant: &TenantRoot) -> Self {
        Self {
            account_number: tenant.account_number.to_string(),
            company_name: tenant.profile.company_name.clone(),
            ..Self::base(tenant.id, tenant.id, CallerKind::TenantRoot)
        }
    }

    /// Claims for a hierarchy-node caller.
    pub fn for_node(node: &Node) -> Self {
        Self {
            node_id: Some(node.id),
            level: Some(node.level),
            path: Some(node.path.to_string()),
            account_number: node.full_account_number(),
            company_name: node.profile.company_name.clone(),
            must_change_credential: node.uses_initial_credential,
            ..Self::base(node.id, node.tenant_id, CallerKind::HierarchyNode)
        }
    }

    /// Rebuild the [`Caller`] these claims describe.
    ///
    /// # Errors
    ///
    /// - `MissingClaim` when a hierarchy-node token lacks node id, level or path
    /// - `InvalidFormat` (via [`AuthError::Hierarchy`]) when the path is
    ///   malformed or disagrees with the level
    pub fn to_caller(&self) -> AuthResult<Caller> {
        match self.node_type {
            CallerKind::TenantRoot => Ok(Caller::TenantRoot {
                tenant_id: self.tenant_id,
            }),
            CallerKind::HierarchyNode => {
                let node_id = self
                    .node_id
                    .ok_or_else(|| AuthError::MissingClaim("node_id".to_string()))?;
                let level = self
                    .level
                    .ok_or_else(|| AuthError::MissingClaim("level".to_string()))?;
                let raw_path = self
                    .path
                    .as_deref()
                    .ok_or_else(|| AuthError::MissingClaim("path".to_string()))?;

                let path = TreePath::parse(raw_path)?;
                if path.depth() != level as usize {
                    return Err(HierarchyError::invalid_format("tree path", raw_path).into());
                }

                Ok(Caller::HierarchyNode {
                    tenant_id: self.tenant_id,
                    node_id,
                    level,
                    path,
                })
            }
        }
    }

    /// Re-stamp the registered claims for a new token.
    pub fn stamped(
        mut self,
        issuer: &str,
        audience: &[String],
        duration: Duration,
        token_type: TokenType,
    ) -> Self {
        let now = Utc::now();
        self.iss = issuer.to_string();
        self.aud = audience.to_vec();
        self.iat = now.timestamp();
        self.nbf = now.timestamp();
        self.exp = (now + duration).timestamp();
        self.jti = Uuid::now_v7().to_string();
        self.token_type = token_type;
        self
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Token type enumeration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token (short-lived)
    #[default]
    Access,

    /// Refresh token (long-lived)
    Refresh,
}
