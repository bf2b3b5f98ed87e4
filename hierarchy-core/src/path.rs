//! Materialized ancestry paths
//!
//! A node's path lists the tenant root's account number followed by the
//! hierarchical id of every ancestor and of the node itself:
//!
//! ```text
//! /2412161700/L1-001/             level 1, attached to the tenant root
//! /2412161700/L1-001/L2-001/      child of L1-001
//! /2412161700/L1-001/L2-001/L3-004/
//! ```
//!
//! Because every path ends with the separator, "is a descendant of" is a
//! plain string-prefix test and a whole subtree can be selected without
//! recursive traversal. Path length grows linearly with depth.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::account::AccountNumber;
use crate::error::{HierarchyError, HierarchyResult};
use crate::hierarchical_id::HierarchicalId;

/// Segment separator.
pub const SEPARATOR: char = '/';

/// A validated ancestry path.
///
/// # Examples
///
/// ```
/// use hierarchy_core::{HierarchicalId, TreePath};
///
/// let root = TreePath::parse("/2412161700/L1-001/").unwrap();
/// let child = TreePath::for_child(&root, &HierarchicalId::new(2, 1).unwrap());
///
/// assert_eq!(child.as_str(), "/2412161700/L1-001/L2-001/");
/// assert!(child.is_descendant_of(&root));
/// assert_eq!(child.tenant_segment(), "2412161700");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath(String);

impl TreePath {
    /// Path of a node attached directly to the tenant root:
    /// `"/" + tenant + "/" + id + "/"`.
    pub fn for_root_attached(tenant: &AccountNumber, id: &HierarchicalId) -> Self {
        Self(format!("{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}", tenant, id))
    }

    /// Path of a child: `parent + id + "/"`.
    pub fn for_child(parent: &TreePath, id: &HierarchicalId) -> Self {
        Self(format!("{}{}{SEPARATOR}", parent.0, id))
    }

    /// Parse and validate an externally supplied path.
    pub fn parse(s: &str) -> HierarchyResult<Self> {
        if is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(HierarchyError::invalid_format("tree path", s))
        }
    }

    /// The raw path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` lies under `ancestor`, by string prefix.
    ///
    /// A path is considered a descendant of itself.
    pub fn is_descendant_of(&self, ancestor: &TreePath) -> bool {
        is_descendant(&self.0, &ancestor.0)
    }

    /// First segment: the tenant root's account number.
    pub fn tenant_segment(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// All non-empty segments, tenant segment first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Hierarchical ids of every node on the path, root-attached node first.
    pub fn hierarchical_ids(&self) -> Vec<HierarchicalId> {
        self.segments()
            .skip(1)
            .filter_map(|s| HierarchicalId::parse(s).ok())
            .collect()
    }

    /// Number of hierarchy segments (equals the node's level).
    pub fn depth(&self) -> usize {
        self.segments().count().saturating_sub(1)
    }

    /// Hierarchical id of the node this path belongs to.
    pub fn leaf(&self) -> Option<HierarchicalId> {
        self.segments()
            .last()
            .and_then(|s| HierarchicalId::parse(s).ok())
    }

    /// Number of separator characters.
    pub fn separator_count(&self) -> usize {
        separator_count(&self.0)
    }

    /// Path of the parent node, or `None` for a root-attached path.
    pub fn parent(&self) -> Option<TreePath> {
        if self.depth() <= 1 {
            return None;
        }
        let trimmed = self.0.trim_end_matches(SEPARATOR);
        trimmed
            .rfind(SEPARATOR)
            .map(|idx| TreePath(trimmed[..=idx].to_string()))
    }
}

/// Whether `path` is a well-formed ancestry path.
///
/// Requires a leading and trailing separator, no empty segments, a
/// non-empty alphanumeric tenant segment, and at least one further segment,
/// each matching the hierarchical-id grammar.
pub fn is_valid(path: &str) -> bool {
    let Some(inner) = path
        .strip_prefix(SEPARATOR)
        .and_then(|p| p.strip_suffix(SEPARATOR))
    else {
        return false;
    };

    let mut segments = inner.split(SEPARATOR);
    let tenant_ok = segments
        .next()
        .map(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_alphanumeric()))
        .unwrap_or(false);
    if !tenant_ok {
        return false;
    }

    let mut hierarchy_segments = 0usize;
    for segment in segments {
        if !HierarchicalId::is_valid(segment) {
            return false;
        }
        hierarchy_segments += 1;
    }
    hierarchy_segments > 0
}

/// Plain string-prefix descendant test.
pub fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate.starts_with(ancestor)
}

/// Count of separator characters in `path`.
pub fn separator_count(path: &str) -> usize {
    path.chars().filter(|c| *c == SEPARATOR).count()
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TreePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TreePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TreePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
