//! Entity, pair, and name-label identifiers.
//!
//! Entities are opaque integer annotation ids supplied externally; the
//! engine never creates or destroys them. Pairs are always stored in
//! normalized (low, high) order so edge lookups are order-independent by
//! construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque annotation id. Immutable identity, supplied externally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId(id)
    }
}

/// Name label assigned to a cluster for display/bookkeeping.
///
/// Stable across insertions as long as the cluster does not merge or
/// split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameId(pub u64);

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Normalized unordered entity pair.
///
/// The constructor swaps endpoints so `lo <= hi`; `Pair::new(u, v)` and
/// `Pair::new(v, u)` are the same value, which makes edge symmetry an
/// invariant of the type rather than of every call site. Serializes as a
/// two-element `[lo, hi]` array, the wire form review clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Pair {
    lo: EntityId,
    hi: EntityId,
}

impl Pair {
    /// Create a normalized pair. Endpoint order does not matter.
    pub fn new(u: impl Into<EntityId>, v: impl Into<EntityId>) -> Self {
        let (u, v) = (u.into(), v.into());
        if u <= v {
            Pair { lo: u, hi: v }
        } else {
            Pair { lo: v, hi: u }
        }
    }

    /// Lower endpoint.
    pub fn lo(&self) -> EntityId {
        self.lo
    }

    /// Higher endpoint.
    pub fn hi(&self) -> EntityId {
        self.hi
    }

    /// Both endpoints in normalized order.
    pub fn endpoints(&self) -> (EntityId, EntityId) {
        (self.lo, self.hi)
    }

    /// True if the pair degenerates to a single entity.
    pub fn is_self_pair(&self) -> bool {
        self.lo == self.hi
    }

    /// Given one endpoint, return the other. Returns `None` if `id` is
    /// not an endpoint of this pair.
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if id == self.lo {
            Some(self.hi)
        } else if id == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}

impl From<(i64, i64)> for Pair {
    fn from((u, v): (i64, i64)) -> Self {
        Pair::new(u, v)
    }
}

impl From<Pair> for (i64, i64) {
    fn from(p: Pair) -> Self {
        (p.lo.0, p.hi.0)
    }
}
