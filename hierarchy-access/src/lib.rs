//! # Hierarchy Access Scope
//!
//! This crate decides which hierarchy nodes a caller may view or manage.
//! There are no roles or permission sets: the answer follows from the
//! caller's position in the tree alone.
//!
//! ## Overview
//!
//! The hierarchy-access crate handles:
//! - **Callers**: Closed variant over tenant roots and hierarchy nodes
//! - **Scopes**: The authorization predicate derived from tree paths
//! - **Resolution**: Loading a caller's authorized node set from storage
//!
//! ## Architecture
//!
//! ```text
//! Caller::TenantRoot       -> AccessScope::Tenant           (every node)
//! Caller::HierarchyNode    -> AccessScope::SelfAndChildren  (self + level L+1)
//!
//! /2412161700/L1-001/                 caller (L = 1)      in scope
//! /2412161700/L1-001/L2-001/          direct child        in scope
//! /2412161700/L1-001/L2-001/L3-001/   grandchild          excluded
//! /2412161700/L1-002/                 sibling             excluded
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hierarchy_access::{authorized_scope, Caller};
//! use hierarchy_core::Node;
//!
//! fn visible(caller: &Caller, nodes: Vec<Node>) -> Vec<Node> {
//!     authorized_scope(caller).filter(nodes)
//! }
//! ```
//!
//! ## Integration with hierarchy-core
//!
//! Scope checks raise `HierarchyError::Unauthorized`, so the transport
//! layer maps them with the same `status_code()` as every other error.

pub mod caller;
pub mod resolver;
pub mod scope;

// Re-export main types for convenience
pub use caller::{Caller, CallerKind};
pub use resolver::ScopeResolver;
pub use scope::{authorized_scope, AccessScope};
