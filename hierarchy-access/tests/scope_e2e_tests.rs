//! End-to-end tests for access-scope resolution.
//!
//! Builds the reference hierarchy through the node lifecycle and checks the
//! authorized set of each caller kind:
//!
//! ```text
//! 2412161700
//!   ├─ L1-001
//!   │    ├─ L2-001
//!   │    │    └─ L3-001
//!   │    └─ L2-002
//!   └─ L1-002
//! ```

use chrono::NaiveDate;
use hierarchy_access::{authorized_scope, Caller, ScopeResolver};
use hierarchy_core::{
    BcryptHasher, FixedClock, HierarchyConfig, MemoryStore, Node, NodeLifecycle, NodeProfile,
    TenantProfile, TenantRegistry, TenantRoot, TenantSignup,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Reference hierarchy plus the resolver under test.
struct TestFixture {
    resolver: ScopeResolver,
    tenant: TenantRoot,
    l1: Node,
    l1_sibling: Node,
    l2_first: Node,
    l2_second: Node,
    l3: Node,
    foreign: Node,
}

impl TestFixture {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(BcryptHasher::new(4));
        let config = HierarchyConfig::default();
        let date = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();

        let registry = TenantRegistry::new(store.clone(), hasher.clone(), &config)
            .with_clock(Arc::new(FixedClock(date)));
        let lifecycle = NodeLifecycle::new(store.clone(), store.clone(), hasher, &config);

        let tenant = register(&registry, "hq@acme.example").await;
        let other = register(&registry, "hq@other.example").await;

        let l1 = create(&lifecycle, tenant.id, None, "Plant A").await;
        let l1_sibling = create(&lifecycle, tenant.id, None, "Plant B").await;
        let l2_first = create(&lifecycle, tenant.id, Some(l1.id), "Line 1").await;
        let l2_second = create(&lifecycle, tenant.id, Some(l1.id), "Line 2").await;
        let l3 = create(&lifecycle, tenant.id, Some(l2_first.id), "Cell 1").await;
        let foreign = create(&lifecycle, other.id, None, "Other Plant").await;

        Self {
            resolver: ScopeResolver::new(store),
            tenant,
            l1,
            l1_sibling,
            l2_first,
            l2_second,
            l3,
            foreign,
        }
    }

    async fn visible_ids(&self, caller: &Caller) -> HashSet<Uuid> {
        self.resolver
            .accessible_nodes(caller)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect()
    }
}

async fn create(
    lifecycle: &NodeLifecycle,
    tenant_id: Uuid,
    parent: Option<Uuid>,
    name: &str,
) -> Node {
    lifecycle
        .create(tenant_id, parent, NodeProfile::new(name))
        .await
        .unwrap()
}

async fn register(registry: &TenantRegistry, email: &str) -> TenantRoot {
    registry
        .register(TenantSignup {
            profile: TenantProfile::new("Acme Corp", email, "Kim"),
            password: "Str0ng!pw".to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_worked_example_scope() {
    let fx = TestFixture::new().await;
    assert_eq!(fx.l1.path.as_str(), "/2412161700/L1-001/");
    assert_eq!(fx.l3.path.as_str(), "/2412161700/L1-001/L2-001/L3-001/");

    let visible = fx.visible_ids(&Caller::for_node(&fx.l1)).await;
    let expected: HashSet<Uuid> = [fx.l1.id, fx.l2_first.id, fx.l2_second.id]
        .into_iter()
        .collect();
    assert_eq!(visible, expected);

    // The L3 path starts with the caller's path but is still excluded.
    assert!(fx.l3.path.is_descendant_of(&fx.l1.path));
    assert!(!visible.contains(&fx.l3.id));
}

#[tokio::test]
async fn test_tenant_root_sees_every_node_of_its_tenant() {
    let fx = TestFixture::new().await;

    let visible = fx.visible_ids(&Caller::for_tenant(&fx.tenant)).await;
    assert_eq!(visible.len(), 5);
    assert!(visible.contains(&fx.l3.id));
    assert!(!visible.contains(&fx.foreign.id));
}

#[tokio::test]
async fn test_middle_node_sees_its_child_only() {
    let fx = TestFixture::new().await;

    let visible = fx.visible_ids(&Caller::for_node(&fx.l2_first)).await;
    let expected: HashSet<Uuid> = [fx.l2_first.id, fx.l3.id].into_iter().collect();
    assert_eq!(visible, expected);
}

#[tokio::test]
async fn test_no_sibling_ancestor_or_foreign_access() {
    let fx = TestFixture::new().await;
    let scope = authorized_scope(&Caller::for_node(&fx.l2_second));

    assert!(scope.contains(&fx.l2_second));
    assert!(!scope.contains(&fx.l2_first));
    assert!(!scope.contains(&fx.l1));
    assert!(!scope.contains(&fx.l1_sibling));
    assert!(!scope.contains(&fx.foreign));

    let leaf = fx.visible_ids(&Caller::for_node(&fx.l3)).await;
    assert_eq!(leaf.len(), 1);
}
