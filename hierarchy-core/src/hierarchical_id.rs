//! Hierarchical node identifiers
//!
//! A hierarchical id has the form `L{level}-{seq:03}` (e.g. `L2-014`) and is
//! unique within a `(tenant, level)` pair only. `L1-001` exists once per
//! tenant, and `L2-001` coexists with `L1-001` in the same tenant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{HierarchyError, HierarchyResult};
use crate::store::NodeStore;

/// Largest sequence that fits the fixed three-digit field.
pub const MAX_SEQUENCE: u32 = 999;

/// Identifier of a hierarchy node, unique per `(tenant, level)`.
///
/// # Examples
///
/// ```
/// use hierarchy_core::HierarchicalId;
///
/// let id = HierarchicalId::new(2, 14).unwrap();
/// assert_eq!(id.to_string(), "L2-014");
///
/// let parsed: HierarchicalId = "L2-014".parse().unwrap();
/// assert_eq!(parsed, id);
/// assert!("L2-14".parse::<HierarchicalId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierarchicalId {
    level: u32,
    sequence: u32,
}

impl HierarchicalId {
    /// Build an id, rejecting level 0 and sequences outside `1..=999`.
    pub fn new(level: u32, sequence: u32) -> HierarchyResult<Self> {
        if level == 0 || sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(HierarchyError::invalid_format(
                "hierarchical id",
                format!("L{}-{:03}", level, sequence),
            ));
        }
        Ok(Self { level, sequence })
    }

    /// Parse the strict `L{level}-{seq:03}` grammar.
    pub fn parse(s: &str) -> HierarchyResult<Self> {
        let invalid = || HierarchyError::invalid_format("hierarchical id", s);

        let rest = s.strip_prefix('L').ok_or_else(invalid)?;
        let (level, sequence) = rest.split_once('-').ok_or_else(invalid)?;

        if level.is_empty()
            || level.starts_with('0')
            || !level.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if sequence.len() != 3 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let level: u32 = level.parse().map_err(|_| invalid())?;
        let sequence: u32 = sequence.parse().map_err(|_| invalid())?;
        Self::new(level, sequence).map_err(|_| invalid())
    }

    /// Whether `s` matches the hierarchical-id grammar.
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// Depth this id was allocated for.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Numeric suffix.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for HierarchicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}-{:03}", self.level, self.sequence)
    }
}

impl FromStr for HierarchicalId {
    type Err = HierarchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HierarchicalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HierarchicalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Mints hierarchical ids unique within `(tenant, level)`.
///
/// The next sequence is a pure function of persisted state: it starts at
/// `count_at_level + 1` and walks forward while the candidate is taken.
/// Concurrent allocators may compute the same candidate; the loser sees the
/// collision (here or on insert) and retries, bounded by `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct HierarchicalIdAllocator {
    max_attempts: u32,
}

impl HierarchicalIdAllocator {
    /// Create an allocator with the given collision retry budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Allocate the next free id for `(tenant_id, level)`.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::CapacityExceeded`] once the sequence would pass
    /// 999 or the attempt budget runs out.
    pub async fn allocate(
        &self,
        store: &dyn NodeStore,
        tenant_id: Uuid,
        level: u32,
    ) -> HierarchyResult<HierarchicalId> {
        if level == 0 {
            return Err(HierarchyError::invalid_format("level", "0"));
        }

        let existing = store.count_at_level(tenant_id, level).await?;
        let mut sequence = u32::try_from(existing.saturating_add(1)).unwrap_or(u32::MAX);
        let scope = || format!("tenant {} level {}", tenant_id, level);

        for attempt in 1..=self.max_attempts {
            if sequence > MAX_SEQUENCE {
                return Err(HierarchyError::CapacityExceeded {
                    scope: scope(),
                    attempted: format!("L{}-{}", level, sequence),
                    reason: format!("sequence exceeds {} at this level", MAX_SEQUENCE),
                });
            }

            let candidate = HierarchicalId::new(level, sequence)?;
            tracing::debug!(%tenant_id, level, attempt, candidate = %candidate, "Trying hierarchical id");

            if !store.exists_by_identifier(tenant_id, level, &candidate).await? {
                return Ok(candidate);
            }

            tracing::warn!(%tenant_id, level, attempt, candidate = %candidate, "Hierarchical id collision, retrying");
            sequence += 1;
        }

        Err(HierarchyError::CapacityExceeded {
            scope: scope(),
            attempted: format!("L{}-{:03}", level, sequence.saturating_sub(1)),
            reason: format!("{} allocation attempts exhausted", self.max_attempts),
        })
    }
}
