//! End-to-end tests for tenant registration and node creation.
//!
//! These tests drive the registry and the node lifecycle against the
//! in-memory store and check the structural properties every node must
//! satisfy:
//! 1. level(n) = level(parent(n)) + 1, root-attached nodes at level 1
//! 2. path(n) extends path(parent(n)) and ends with its own id
//! 3. hierarchical ids are unique per (tenant, level) under concurrency
//! 4. the initial credential is replaced exactly once

use chrono::NaiveDate;
use hierarchy_core::{
    BcryptHasher, FixedClock, HierarchicalId, HierarchyConfig, HierarchyError, MemoryStore, Node,
    NodeLifecycle, NodeProfile, NodeStore, TenantProfile, TenantRegistry, TenantRoot, TenantSignup,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Test fixture wiring registry and lifecycle to one shared store.
struct TestFixture {
    /// Shared in-memory store.
    store: Arc<MemoryStore>,
    /// Tenant-root registry with a fixed clock (2024-12-16).
    registry: TenantRegistry,
    /// Node lifecycle.
    lifecycle: Arc<NodeLifecycle>,
}

impl TestFixture {
    fn new(config: HierarchyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(BcryptHasher::new(4));
        let date = NaiveDate::from_ymd_opt(2024, 12, 16).unwrap();

        let registry = TenantRegistry::new(store.clone(), hasher.clone(), &config)
            .with_clock(Arc::new(FixedClock(date)));
        let lifecycle = Arc::new(NodeLifecycle::new(
            store.clone(),
            store.clone(),
            hasher,
            &config,
        ));

        Self {
            store,
            registry,
            lifecycle,
        }
    }

    async fn tenant(&self, email: &str) -> TenantRoot {
        self.registry
            .register(TenantSignup {
                profile: TenantProfile::new("Acme Corp", email, "Kim"),
                password: "Str0ng!pw".to_string(),
            })
            .await
            .unwrap()
    }

    async fn node(&self, tenant: &TenantRoot, parent: Option<&Node>, name: &str) -> Node {
        self.lifecycle
            .create(tenant.id, parent.map(|p| p.id), NodeProfile::new(name))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_worked_example() {
    let fixture = TestFixture::new(HierarchyConfig::default());

    let tenant = fixture.tenant("hq@acme.example").await;
    let second = fixture.tenant("hq@other.example").await;
    assert_eq!(tenant.account_number.as_str(), "2412161700");
    assert_eq!(second.account_number.as_str(), "2412161701");

    let l1 = fixture.node(&tenant, None, "Plant A").await;
    assert_eq!(l1.hierarchical_id.to_string(), "L1-001");
    assert_eq!(l1.path.as_str(), "/2412161700/L1-001/");

    let first_child = fixture.node(&tenant, Some(&l1), "Line 1").await;
    let sibling = fixture.node(&tenant, Some(&l1), "Line 2").await;
    assert_eq!(first_child.hierarchical_id.to_string(), "L2-001");
    assert_eq!(first_child.path.as_str(), "/2412161700/L1-001/L2-001/");
    assert_eq!(sibling.hierarchical_id.to_string(), "L2-002");
    assert_eq!(sibling.path.as_str(), "/2412161700/L1-001/L2-002/");
}

#[tokio::test]
async fn test_level_and_path_properties() {
    let fixture = TestFixture::new(HierarchyConfig::default());
    let tenant = fixture.tenant("hq@acme.example").await;

    let a = fixture.node(&tenant, None, "A").await;
    let b = fixture.node(&tenant, None, "B").await;
    let a1 = fixture.node(&tenant, Some(&a), "A1").await;
    let a2 = fixture.node(&tenant, Some(&a), "A2").await;
    let a1x = fixture.node(&tenant, Some(&a1), "A1x").await;
    let b1 = fixture.node(&tenant, Some(&b), "B1").await;

    let all = fixture.store.find_in_tenant(tenant.id).await.unwrap();
    assert_eq!(all.len(), 6);

    for node in &all {
        assert!(node.path.as_str().starts_with(&format!("/{}/", tenant.account_number)));
        assert!(node.path.as_str().ends_with(&format!("{}/", node.hierarchical_id)));
        assert_eq!(node.path.depth() as u32, node.level);

        match node.parent_id {
            None => assert_eq!(node.level, 1),
            Some(parent_id) => {
                let parent = all.iter().find(|p| p.id == parent_id).unwrap();
                assert_eq!(node.level, parent.level + 1);
                assert!(node.path.as_str().starts_with(parent.path.as_str()));
            }
        }
    }

    // Descendant test is true for true ancestors only.
    assert!(a1x.path.is_descendant_of(&a.path));
    assert!(a1x.path.is_descendant_of(&a1.path));
    assert!(!a1x.path.is_descendant_of(&a2.path));
    assert!(!a1x.path.is_descendant_of(&b.path));
    assert!(!b1.path.is_descendant_of(&a.path));

    // Sequence restarts per level: B1 is the third level-2 node.
    assert_eq!(b1.hierarchical_id.to_string(), "L2-003");
    assert_eq!(a1x.hierarchical_id.to_string(), "L3-001");
}

#[tokio::test]
async fn test_hierarchical_ids_repeat_across_tenants() {
    let fixture = TestFixture::new(HierarchyConfig::default());
    let acme = fixture.tenant("hq@acme.example").await;
    let other = fixture.tenant("hq@other.example").await;

    let acme_l1 = fixture.node(&acme, None, "Acme Plant").await;
    let other_l1 = fixture.node(&other, None, "Other Plant").await;

    assert_eq!(acme_l1.hierarchical_id, other_l1.hierarchical_id);
    assert_eq!(acme_l1.full_account_number(), "2412161700-L1-001");
    assert_eq!(other_l1.full_account_number(), "2412161701-L1-001");
    assert_ne!(acme_l1.path, other_l1.path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_never_duplicates_ids() {
    let fixture = TestFixture::new(HierarchyConfig {
        max_allocation_attempts: 32,
        ..Default::default()
    });
    let tenant = fixture.tenant("hq@acme.example").await;
    let parent = fixture.node(&tenant, None, "Plant A").await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let lifecycle = fixture.lifecycle.clone();
        let tenant_id = tenant.id;
        let parent_id = parent.id;
        handles.push(tokio::spawn(async move {
            lifecycle
                .create(tenant_id, Some(parent_id), NodeProfile::new(format!("Line {i}")))
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let node = handle.await.unwrap().unwrap();
        assert_eq!(node.level, 2);
        assert!(ids.insert(node.hierarchical_id), "duplicate {}", node.hierarchical_id);
    }

    let expected: HashSet<HierarchicalId> = (1..=16)
        .map(|seq| HierarchicalId::new(2, seq).unwrap())
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(fixture.store.count_at_level(tenant.id, 2).await.unwrap(), 16);
}

#[tokio::test]
async fn test_sequential_allocation_is_increasing() {
    let fixture = TestFixture::new(HierarchyConfig::default());
    let tenant = fixture.tenant("hq@acme.example").await;

    let mut last = 0;
    for i in 0..5 {
        let node = fixture.node(&tenant, None, &format!("Plant {i}")).await;
        assert!(node.hierarchical_id.sequence() > last);
        last = node.hierarchical_id.sequence();
    }
    assert_eq!(last, 5);
}

#[tokio::test]
async fn test_initial_credential_flag_flips_once() {
    let fixture = TestFixture::new(HierarchyConfig::default());
    let tenant = fixture.tenant("hq@acme.example").await;
    let node = fixture.node(&tenant, None, "Plant A").await;

    let awaiting = fixture
        .lifecycle
        .awaiting_credential_change(tenant.id)
        .await
        .unwrap();
    assert_eq!(awaiting.len(), 1);

    fixture
        .lifecycle
        .change_initial_credential(node.id, "N3w!secret")
        .await
        .unwrap();

    let second = fixture
        .lifecycle
        .change_initial_credential(node.id, "An0ther!secret")
        .await;
    assert!(matches!(
        second,
        Err(HierarchyError::InitialCredentialConsumed { .. })
    ));

    // Ordinary changes still work and never bring the flag back.
    fixture
        .lifecycle
        .change_credential(node.id, "N3w!secret", "An0ther!secret")
        .await
        .unwrap();
    let node = fixture.lifecycle.find(node.id).await.unwrap();
    assert!(!node.uses_initial_credential);
    assert!(fixture
        .lifecycle
        .awaiting_credential_change(tenant.id)
        .await
        .unwrap()
        .is_empty());
}
