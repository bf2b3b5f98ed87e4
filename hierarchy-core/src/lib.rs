//! # Tenant Hierarchy Core
//!
//! Identity engine for a two-tier organizational hierarchy: one tenant root
//! per organization, with an arbitrarily deep tree of hierarchy nodes
//! beneath it.
//!
//! ## Overview
//!
//! The hierarchy-core crate handles:
//! - **Account numbers**: Globally unique, date-banded tenant-root identifiers
//! - **Hierarchical ids**: `L{level}-{seq}` identifiers unique per tenant and level
//! - **Tree paths**: Materialized ancestry paths with prefix-based subtree selection
//! - **Node lifecycle**: Creation, initial credential, two-phase path persistence
//! - **Tenant registry**: Tenant-root sign-up and account-number issuance
//! - **Storage**: Async store traits plus an in-memory implementation
//!
//! ## Architecture
//!
//! ```text
//! TenantRoot 2412161700
//!   ├─ Node L1-001   /2412161700/L1-001/
//!   │    ├─ Node L2-001   /2412161700/L1-001/L2-001/
//!   │    └─ Node L2-002   /2412161700/L1-001/L2-002/
//!   └─ Node L1-002   /2412161700/L1-002/
//! ```
//!
//! Identifier sequences are pure functions of persisted state (`count + 1`,
//! retried on collision), so any number of stateless instances stay
//! consistent through the shared store alone.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hierarchy_core::{
//!     BcryptHasher, HierarchyConfig, MemoryStore, NodeLifecycle, NodeProfile,
//!     TenantProfile, TenantRegistry, TenantSignup,
//! };
//!
//! # async fn example() -> hierarchy_core::HierarchyResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let hasher = Arc::new(BcryptHasher::default());
//! let config = HierarchyConfig::from_env();
//!
//! let registry = TenantRegistry::new(store.clone(), hasher.clone(), &config);
//! let tenant = registry
//!     .register(TenantSignup {
//!         profile: TenantProfile::new("Acme Corp", "hq@acme.example", "Kim"),
//!         password: "Str0ng!pw".to_string(),
//!     })
//!     .await?;
//!
//! let lifecycle = NodeLifecycle::new(store.clone(), store, hasher, &config);
//! let plant = lifecycle
//!     .create(tenant.id, None, NodeProfile::new("Plant A"))
//!     .await?;
//! let line = lifecycle
//!     .create(tenant.id, Some(plant.id), NodeProfile::new("Line 1"))
//!     .await?;
//!
//! assert!(line.path.is_descendant_of(&plant.path));
//! # Ok(())
//! # }
//! ```
//!
//! ## Cross-Crate Integration
//!
//! - `hierarchy-access`: Authorized-scope predicate built on tree paths
//! - `hierarchy-auth`: Login flows and token claims
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support (enabled by default)

pub mod account;
pub mod config;
pub mod credential;
pub mod error;
pub mod hierarchical_id;
pub mod lifecycle;
pub mod memory;
pub mod node;
pub mod path;
pub mod registry;
pub mod store;
pub mod tenant;

// Re-export main types for convenience
pub use account::{AccountNumber, AccountNumberAllocator, Clock, DailyAccountStats, FixedClock, SystemClock};
pub use config::{AccountBand, ConfigError, HierarchyConfig};
pub use credential::{BcryptHasher, CredentialHasher, PasswordPolicy};
pub use error::{HierarchyError, HierarchyResult};
pub use hierarchical_id::{HierarchicalId, HierarchicalIdAllocator};
pub use lifecycle::NodeLifecycle;
pub use memory::MemoryStore;
pub use node::{Node, NodeDraft, NodeProfile, NodeStatus, ProfileUpdate};
pub use path::TreePath;
pub use registry::TenantRegistry;
pub use store::{NodeStore, StoreError, StoreResult, TenantStore, UniqueConstraint};
pub use tenant::{TenantProfile, TenantRoot, TenantSignup, TenantStatus};
