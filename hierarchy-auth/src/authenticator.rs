//! Login for tenant roots and hierarchy nodes
//!
//! Tenant roots sign in with their email. Hierarchy nodes sign in with the
//! owning tenant's account number plus their hierarchical id, the same pair
//! that is printed as `2412161700-L1-001`.
//!
//! Unknown accounts and wrong secrets both surface as
//! [`AuthError::InvalidCredentials`], and both pay for one hash
//! verification, so a caller cannot probe which accounts exist.
//!
//! Refresh tokens are exchanged here rather than in the signer: the subject
//! is reloaded so suspensions and credential changes take effect at the
//! next refresh.

use std::sync::Arc;

use hierarchy_access::CallerKind;
use hierarchy_core::{CredentialHasher, HierarchicalId, NodeStore, StoreError, TenantStore};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::claims::{ScopeClaims, TokenType};
use crate::error::{AuthError, AuthResult};
use crate::issuer::{TokenIssuer, TokenPair};

/// Secret hashed once to give unknown-account logins a hash to verify against.
const DUMMY_SECRET: &str = "unknown-account-placeholder";

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    /// Claims to hand to a [`crate::TokenIssuer`]
    pub claims: ScopeClaims,

    /// The caller must replace its generated credential before doing
    /// anything else
    pub must_change_credential: bool,
}

/// Verifies secrets against stored hashes and builds scope claims.
pub struct Authenticator {
    tenants: Arc<dyn TenantStore>,
    nodes: Arc<dyn NodeStore>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_hash: OnceCell<String>,
}

impl Authenticator {
    /// Create an authenticator over the given stores.
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        nodes: Arc<dyn NodeStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            tenants,
            nodes,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Sign in a tenant root by email.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown email or a wrong secret
    /// - `AccountLocked` when the tenant is not active
    pub async fn login_tenant(&self, email: &str, secret: &str) -> AuthResult<LoginOutcome> {
        let Some(tenant) = self.tenants.find_tenant_by_email(email).await.map_err(hierarchy)? else {
            self.burn_verification(secret).await?;
            warn!(email, outcome = "unknown_account", "Tenant login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(secret, &tenant.credential_hash).await? {
            warn!(tenant_id = %tenant.id, outcome = "wrong_secret", "Tenant login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        if !tenant.is_active() {
            warn!(
                tenant_id = %tenant.id,
                status = tenant.status.as_str(),
                outcome = "locked",
                "Tenant login rejected"
            );
            return Err(AuthError::AccountLocked);
        }

        info!(tenant_id = %tenant.id, outcome = "success", "Tenant signed in");
        Ok(LoginOutcome {
            claims: ScopeClaims::for_tenant(&tenant),
            must_change_credential: false,
        })
    }

    /// Sign in a hierarchy node by tenant account number and hierarchical id.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for a malformed id, an unknown account or
    ///   node, or a wrong secret
    /// - `AccountLocked` when the node or its tenant is not active
    pub async fn login_node(
        &self,
        account_number: &str,
        hierarchical_id: &str,
        secret: &str,
    ) -> AuthResult<LoginOutcome> {
        let Ok(id) = HierarchicalId::parse(hierarchical_id) else {
            self.burn_verification(secret).await?;
            warn!(account_number, hierarchical_id, outcome = "malformed_id", "Node login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(tenant) = self
            .tenants
            .find_tenant_by_account_number(account_number)
            .await
            .map_err(hierarchy)?
        else {
            self.burn_verification(secret).await?;
            warn!(account_number, outcome = "unknown_account", "Node login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(node) = self
            .nodes
            .find_node_by_hierarchical_id(tenant.id, &id)
            .await
            .map_err(hierarchy)?
        else {
            self.burn_verification(secret).await?;
            warn!(tenant_id = %tenant.id, hierarchical_id, outcome = "unknown_node", "Node login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(secret, &node.credential_hash).await? {
            warn!(node_id = %node.id, outcome = "wrong_secret", "Node login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        if !node.is_active() || !tenant.is_active() {
            warn!(node_id = %node.id, tenant_id = %tenant.id, outcome = "locked", "Node login rejected");
            return Err(AuthError::AccountLocked);
        }

        info!(
            node_id = %node.id,
            tenant_id = %tenant.id,
            level = node.level,
            must_change_credential = node.uses_initial_credential,
            outcome = "success",
            "Node signed in"
        );
        Ok(LoginOutcome {
            must_change_credential: node.uses_initial_credential,
            claims: ScopeClaims::for_node(&node),
        })
    }

    /// Sign in a hierarchy node by its full display account number
    /// (`2412161700-L1-001`).
    pub async fn login_node_by_full_account(
        &self,
        full_account_number: &str,
        secret: &str,
    ) -> AuthResult<LoginOutcome> {
        let Some((account_number, hierarchical_id)) = full_account_number.split_once('-') else {
            self.burn_verification(secret).await?;
            warn!(full_account_number, outcome = "malformed_id", "Node login rejected");
            return Err(AuthError::InvalidCredentials);
        };
        self.login_node(account_number, hierarchical_id, secret).await
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The subject is reloaded, so the new claims reflect its current
    /// status and credential state.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for an access token or a subject that no longer exists
    /// - `AccountLocked` when the node or its tenant is no longer active
    pub async fn refresh(
        &self,
        issuer: &dyn TokenIssuer,
        refresh_token: &str,
    ) -> AuthResult<TokenPair> {
        let previous = issuer.validate_token(refresh_token)?;
        if previous.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken("Not a refresh token".to_string()));
        }

        let claims = self.reload_claims(&previous).await?;
        info!(sub = %claims.sub, tenant_id = %claims.tenant_id, outcome = "success", "Token refreshed");
        issuer.issue_pair(&claims)
    }

    /// Rebuild claims for the subject of `previous` from storage.
    pub async fn reload_claims(&self, previous: &ScopeClaims) -> AuthResult<ScopeClaims> {
        match previous.node_type {
            CallerKind::TenantRoot => {
                let tenant = self.active_tenant(previous.tenant_id).await?;
                Ok(ScopeClaims::for_tenant(&tenant))
            }
            CallerKind::HierarchyNode => {
                let node_id = previous
                    .node_id
                    .ok_or_else(|| AuthError::MissingClaim("node_id".to_string()))?;
                let node = self
                    .nodes
                    .find_node(node_id)
                    .await
                    .map_err(hierarchy)?
                    .filter(|n| n.tenant_id == previous.tenant_id)
                    .ok_or_else(|| AuthError::InvalidToken("Subject no longer exists".to_string()))?;

                self.active_tenant(node.tenant_id).await?;
                if !node.is_active() {
                    warn!(node_id = %node.id, outcome = "locked", "Token refresh rejected");
                    return Err(AuthError::AccountLocked);
                }
                Ok(ScopeClaims::for_node(&node))
            }
        }
    }

    async fn active_tenant(&self, tenant_id: Uuid) -> AuthResult<hierarchy_core::TenantRoot> {
        let tenant = self
            .tenants
            .find_tenant(tenant_id)
            .await
            .map_err(hierarchy)?
            .ok_or_else(|| AuthError::InvalidToken("Subject no longer exists".to_string()))?;
        if !tenant.is_active() {
            warn!(tenant_id = %tenant.id, outcome = "locked", "Token refresh rejected");
            return Err(AuthError::AccountLocked);
        }
        Ok(tenant)
    }

    /// Verify `secret` against a throwaway hash so rejected lookups cost
    /// the same as a wrong secret.
    async fn burn_verification(&self, secret: &str) -> AuthResult<()> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hasher.hash(DUMMY_SECRET))
            .await?;
        self.hasher.verify(secret, dummy).await?;
        Ok(())
    }
}

fn hierarchy(e: StoreError) -> AuthError {
    AuthError::Hierarchy(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hierarchy_access::CallerKind;
    use async_trait::async_trait;
    use hierarchy_core::HierarchyResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use hierarchy_core::{
        BcryptHasher, FixedClock, HierarchyConfig, MemoryStore, Node, NodeLifecycle, NodeProfile,
        NodeStatus, TenantProfile, TenantRegistry, TenantRoot, TenantSignup, TenantStatus,
    };

    const PASSWORD: &str = "Str0ng!pw";

    struct TestFixture {
        authenticator: Authenticator,
        registry: TenantRegistry,
        lifecycle: NodeLifecycle,
        tenant: TenantRoot,
    }

    impl TestFixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let hasher = Arc::new(BcryptHasher::new(4));
            let config = HierarchyConfig::default();
            let date = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();

            let registry = TenantRegistry::new(store.clone(), hasher.clone(), &config)
                .with_clock(Arc::new(FixedClock(date)));
            let lifecycle =
                NodeLifecycle::new(store.clone(), store.clone(), hasher.clone(), &config);
            let authenticator = Authenticator::new(store.clone(), store, hasher);

            let tenant = registry
                .register(TenantSignup {
                    profile: TenantProfile::new("Acme Corp", "hq@acme.example", "Kim"),
                    password: PASSWORD.to_string(),
                })
                .await
                .unwrap();

            Self {
                authenticator,
                registry,
                lifecycle,
                tenant,
            }
        }

        /// Root-attached node whose initial credential is its id (`L1-001`).
        async fn node(&self) -> Node {
            self.lifecycle
                .create(self.tenant.id, None, NodeProfile::new("Plant A"))
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_tenant_login() {
        let fx = TestFixture::new().await;

        let outcome = fx
            .authenticator
            .login_tenant("hq@acme.example", PASSWORD)
            .await
            .unwrap();
        assert_eq!(outcome.claims.node_type, CallerKind::TenantRoot);
        assert_eq!(outcome.claims.tenant_id, fx.tenant.id);
        assert!(!outcome.must_change_credential);
    }

    #[tokio::test]
    async fn test_tenant_login_failures_are_indistinguishable() {
        let fx = TestFixture::new().await;

        let unknown = fx
            .authenticator
            .login_tenant("nobody@acme.example", PASSWORD)
            .await;
        let wrong = fx
            .authenticator
            .login_tenant("hq@acme.example", "Wr0ng!pw")
            .await;

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_suspended_tenant_is_locked() {
        let fx = TestFixture::new().await;
        fx.registry
            .change_status(fx.tenant.id, TenantStatus::Suspended)
            .await
            .unwrap();

        let result = fx
            .authenticator
            .login_tenant("hq@acme.example", PASSWORD)
            .await;
        assert!(matches!(result, Err(AuthError::AccountLocked)));
    }

    #[tokio::test]
    async fn test_node_login_with_initial_credential() {
        let fx = TestFixture::new().await;
        let node = fx.node().await;

        let outcome = fx
            .authenticator
            .login_node_by_full_account("2412161700-L1-001", "L1-001")
            .await
            .unwrap();

        assert!(outcome.must_change_credential);
        assert_eq!(outcome.claims.node_id, Some(node.id));
        assert_eq!(outcome.claims.to_caller().unwrap().node_id(), Some(node.id));
    }

    #[tokio::test]
    async fn test_node_login_after_credential_change() {
        let fx = TestFixture::new().await;
        let node = fx.node().await;
        fx.lifecycle
            .change_initial_credential(node.id, "N3w!secret")
            .await
            .unwrap();

        let stale = fx
            .authenticator
            .login_node("2412161700", "L1-001", "L1-001")
            .await;
        assert!(matches!(stale, Err(AuthError::InvalidCredentials)));

        let outcome = fx
            .authenticator
            .login_node("2412161700", "L1-001", "N3w!secret")
            .await
            .unwrap();
        assert!(!outcome.must_change_credential);
    }

    /// Bcrypt hasher that counts verifications.
    struct CountingHasher {
        inner: BcryptHasher,
        verifications: AtomicUsize,
    }

    #[async_trait]
    impl CredentialHasher for CountingHasher {
        async fn hash(&self, secret: &str) -> HierarchyResult<String> {
            self.inner.hash(secret).await
        }

        async fn verify(&self, secret: &str, hash: &str) -> HierarchyResult<bool> {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(secret, hash).await
        }
    }

    #[tokio::test]
    async fn test_unknown_accounts_still_verify_a_hash() {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(CountingHasher {
            inner: BcryptHasher::new(4),
            verifications: AtomicUsize::new(0),
        });
        let authenticator = Authenticator::new(store.clone(), store, hasher.clone());

        let attempts = [
            authenticator.login_tenant("nobody@acme.example", PASSWORD).await,
            authenticator.login_node("2412161799", "L1-001", PASSWORD).await,
            authenticator.login_node("2412161799", "L1-01", PASSWORD).await,
            authenticator.login_node_by_full_account("2412161799", PASSWORD).await,
        ];

        assert!(attempts
            .iter()
            .all(|r| matches!(r, Err(AuthError::InvalidCredentials))));
        assert_eq!(hasher.verifications.load(Ordering::SeqCst), attempts.len());
    }

    /// Collects the `outcome` field of every event.
    #[derive(Clone, Default)]
    struct OutcomeRecorder(Arc<Mutex<Vec<String>>>);

    struct OutcomeVisitor(Option<String>);

    impl Visit for OutcomeVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "outcome" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for OutcomeRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = OutcomeVisitor(None);
            event.record(&mut visitor);
            if let Some(outcome) = visitor.0 {
                self.0.lock().unwrap().push(outcome);
            }
        }
    }

    #[tokio::test]
    async fn test_login_events_carry_outcome() {
        let fx = TestFixture::new().await;
        let recorder = OutcomeRecorder::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(recorder.clone()),
        );

        let _ = fx.authenticator.login_tenant("nobody@acme.example", PASSWORD).await;
        let _ = fx.authenticator.login_tenant("hq@acme.example", "Wr0ng!pw").await;
        fx.authenticator
            .login_tenant("hq@acme.example", PASSWORD)
            .await
            .unwrap();

        let outcomes = recorder.0.lock().unwrap().clone();
        assert_eq!(outcomes, vec!["unknown_account", "wrong_secret", "success"]);
    }

    #[cfg(feature = "jwt")]
    #[tokio::test]
    async fn test_refresh_reloads_subject() {
        use crate::jwt::JwtService;

        let fx = TestFixture::new().await;
        let tokens = JwtService::with_secret("test-secret-key-for-jwt-signing-minimum-32-chars").unwrap();
        let node = fx.node().await;

        let outcome = fx
            .authenticator
            .login_node("2412161700", "L1-001", "L1-001")
            .await
            .unwrap();
        let pair = tokens.issue_pair(&outcome.claims).unwrap();

        fx.lifecycle
            .change_initial_credential(node.id, "N3w!secret")
            .await
            .unwrap();
        let refreshed = fx.authenticator.refresh(&tokens, &pair.refresh_token).await.unwrap();
        let claims = tokens.validate_token(&refreshed.access_token).unwrap();
        assert!(!claims.must_change_credential);
        assert_eq!(claims.node_id, Some(node.id));

        let not_refresh = fx.authenticator.refresh(&tokens, &pair.access_token).await;
        assert!(matches!(not_refresh, Err(AuthError::InvalidToken(_))));

        fx.lifecycle
            .change_status(node.id, NodeStatus::Suspended)
            .await
            .unwrap();
        let locked = fx.authenticator.refresh(&tokens, &refreshed.refresh_token).await;
        assert!(matches!(locked, Err(AuthError::AccountLocked)));
    }

    #[tokio::test]
    async fn test_reload_rejects_tenant_suspended_after_login() {
        let fx = TestFixture::new().await;
        let outcome = fx
            .authenticator
            .login_tenant("hq@acme.example", PASSWORD)
            .await
            .unwrap();

        let fresh = fx.authenticator.reload_claims(&outcome.claims).await.unwrap();
        assert_eq!(fresh.tenant_id, fx.tenant.id);

        fx.registry
            .change_status(fx.tenant.id, TenantStatus::Suspended)
            .await
            .unwrap();
        let locked = fx.authenticator.reload_claims(&outcome.claims).await;
        assert!(matches!(locked, Err(AuthError::AccountLocked)));
    }

    #[tokio::test]
    async fn test_node_login_rejections() {
        let fx = TestFixture::new().await;
        let node = fx.node().await;

        for (account, id) in [
            ("2412161700", "L1-01"),
            ("2412161799", "L1-001"),
            ("2412161700", "L1-002"),
        ] {
            let result = fx.authenticator.login_node(account, id, "L1-001").await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)), "{account} {id}");
        }

        let no_id = fx
            .authenticator
            .login_node_by_full_account("2412161700", "L1-001")
            .await;
        assert!(matches!(no_id, Err(AuthError::InvalidCredentials)));

        fx.lifecycle
            .change_status(node.id, NodeStatus::Inactive)
            .await
            .unwrap();
        let locked = fx
            .authenticator
            .login_node("2412161700", "L1-001", "L1-001")
            .await;
        assert!(matches!(locked, Err(AuthError::AccountLocked)));
    }
}
