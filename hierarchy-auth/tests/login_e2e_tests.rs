//! End-to-end tests for login and token-based authorization.
//!
//! Tests cover:
//! - Node login with the generated credential, then the forced change
//! - Signed tokens rebuilding the caller's access scope
//! - Tenant-root tokens authorizing the whole tenant
//! - Refresh reloading the subject, so suspension locks it out

use chrono::NaiveDate;
use hierarchy_access::{Caller, ScopeResolver};
use hierarchy_auth::{AuthError, Authenticator, JwtService, TokenIssuer, TokenType};
use hierarchy_core::{
    BcryptHasher, FixedClock, HierarchyConfig, HierarchyError, MemoryStore, Node, NodeLifecycle,
    NodeProfile, NodeStatus, TenantProfile, TenantRegistry, TenantRoot, TenantSignup,
};
use std::sync::Arc;

const PASSWORD: &str = "Str0ng!pw";

struct TestFixture {
    authenticator: Authenticator,
    lifecycle: NodeLifecycle,
    resolver: ScopeResolver,
    tokens: JwtService,
    tenant: TenantRoot,
    plant: Node,
    line: Node,
    cell: Node,
}

impl TestFixture {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(BcryptHasher::new(4));
        let config = HierarchyConfig::default();
        let date = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();

        let registry = TenantRegistry::new(store.clone(), hasher.clone(), &config)
            .with_clock(Arc::new(FixedClock(date)));
        let lifecycle = NodeLifecycle::new(store.clone(), store.clone(), hasher.clone(), &config);

        let tenant = registry
            .register(TenantSignup {
                profile: TenantProfile::new("Acme Corp", "hq@acme.example", "Kim"),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();

        let plant = lifecycle
            .create(tenant.id, None, NodeProfile::new("Plant A"))
            .await
            .unwrap();
        let line = lifecycle
            .create(tenant.id, Some(plant.id), NodeProfile::new("Line 1"))
            .await
            .unwrap();
        let cell = lifecycle
            .create(tenant.id, Some(line.id), NodeProfile::new("Cell 1"))
            .await
            .unwrap();

        Self {
            authenticator: Authenticator::new(store.clone(), store.clone(), hasher),
            lifecycle,
            resolver: ScopeResolver::new(store),
            tokens: JwtService::with_secret("test-secret-key-for-jwt-signing-minimum-32-chars")
                .unwrap(),
            tenant,
            plant,
            line,
            cell,
        }
    }
}

#[tokio::test]
async fn test_first_login_requires_credential_change() {
    let fx = TestFixture::new().await;

    let first = fx
        .authenticator
        .login_node_by_full_account("2412161700-L1-001", "L1-001")
        .await
        .unwrap();
    assert!(first.must_change_credential);
    assert!(first.claims.must_change_credential);

    fx.lifecycle
        .change_initial_credential(fx.plant.id, "N3w!secret")
        .await
        .unwrap();

    let second = fx
        .authenticator
        .login_node("2412161700", "L1-001", "N3w!secret")
        .await
        .unwrap();
    assert!(!second.must_change_credential);

    let again = fx
        .lifecycle
        .change_initial_credential(fx.plant.id, "An0ther!pw")
        .await;
    assert!(matches!(
        again,
        Err(HierarchyError::InitialCredentialConsumed { .. })
    ));
}

#[tokio::test]
async fn test_node_token_carries_scope() {
    let fx = TestFixture::new().await;

    let outcome = fx
        .authenticator
        .login_node("2412161700", "L2-001", "L2-001")
        .await
        .unwrap();
    let pair = fx.tokens.issue_pair(&outcome.claims).unwrap();

    let claims = fx.tokens.validate_token(&pair.access_token).unwrap();
    assert_eq!(claims.token_type, TokenType::Access);
    assert_eq!(claims.account_number, "2412161700-L2-001");

    let caller = claims.to_caller().unwrap();
    assert_eq!(caller, Caller::for_node(&fx.line));

    let visible: Vec<_> = fx
        .resolver
        .accessible_nodes(&caller)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(visible.len(), 2);
    assert!(visible.contains(&fx.line.id));
    assert!(visible.contains(&fx.cell.id));

    assert!(fx.resolver.authorize(&caller, fx.cell.id).await.is_ok());
    assert!(fx.resolver.authorize(&caller, fx.plant.id).await.is_err());
}

#[tokio::test]
async fn test_tenant_token_authorizes_whole_tenant() {
    let fx = TestFixture::new().await;

    let outcome = fx
        .authenticator
        .login_tenant("hq@acme.example", PASSWORD)
        .await
        .unwrap();
    let token = fx.tokens.issue_access_token(&outcome.claims).unwrap();
    let caller = fx.tokens.validate_token(&token).unwrap().to_caller().unwrap();

    assert_eq!(caller.tenant_id(), fx.tenant.id);
    let visible = fx.resolver.accessible_nodes(&caller).await.unwrap();
    assert_eq!(visible.len(), 3);
}

#[tokio::test]
async fn test_refresh_after_suspension_is_locked() {
    let fx = TestFixture::new().await;

    let outcome = fx
        .authenticator
        .login_node("2412161700", "L1-001", "L1-001")
        .await
        .unwrap();
    let pair = fx.tokens.issue_pair(&outcome.claims).unwrap();

    fx.lifecycle
        .change_initial_credential(fx.plant.id, "N3w!secret")
        .await
        .unwrap();
    fx.lifecycle
        .change_status(fx.plant.id, NodeStatus::Suspended)
        .await
        .unwrap();

    let result = fx.authenticator.refresh(&fx.tokens, &pair.refresh_token).await;
    assert!(matches!(result, Err(AuthError::AccountLocked)));
}

#[tokio::test]
async fn test_refresh_token_round_trip() {
    let fx = TestFixture::new().await;

    let outcome = fx
        .authenticator
        .login_node("2412161700", "L3-001", "L3-001")
        .await
        .unwrap();
    let pair = fx.tokens.issue_pair(&outcome.claims).unwrap();

    let refreshed = fx
        .authenticator
        .refresh(&fx.tokens, &pair.refresh_token)
        .await
        .unwrap();
    let caller = fx
        .tokens
        .validate_token(&refreshed.access_token)
        .unwrap()
        .to_caller()
        .unwrap();
    assert_eq!(caller.node_id(), Some(fx.cell.id));

    assert!(matches!(
        fx.authenticator.refresh(&fx.tokens, &pair.access_token).await,
        Err(AuthError::InvalidToken(_))
    ));
}
