//! Dynamic cluster index.
//!
//! Tracks the partition of entities into positive-connected clusters
//! together with the incremental counters redundancy and inconsistency
//! queries are answered from: internal edge counts per decision,
//! per-node internal positive degree, and cross-cluster counts per
//! decision.
//!
//! Name labels are stable across insertions; a merge keeps the larger
//! side's label, and rebuilds after a split keep the old label on the
//! largest surviving component.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use reid_core::{Decision, EntityId, NameId};

/// Cross-cluster evidence counts for one cluster pair.
///
/// `pos` is transient: a positive cross edge merges its clusters in the
/// same apply, so persisted cross state never carries positives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrossStats {
    pub pos: u32,
    pub neg: u32,
    pub incomp: u32,
}

impl CrossStats {
    fn is_empty(&self) -> bool {
        self.pos == 0 && self.neg == 0 && self.incomp == 0
    }

    fn bump(&mut self, decision: Decision, delta: i32) {
        let slot = match decision {
            Decision::Positive => &mut self.pos,
            Decision::Negative => &mut self.neg,
            Decision::Incomparable => &mut self.incomp,
            Decision::Unreviewed | Decision::Unknown => return,
        };
        *slot = slot.checked_add_signed(delta).unwrap_or(0);
    }
}

/// One cluster (positive-connected component) with its counters.
#[derive(Debug, Clone)]
pub struct ClusterStats {
    name: NameId,
    nodes: BTreeSet<EntityId>,
    pos_internal: u32,
    neg_internal: u32,
    incomp_internal: u32,
    pos_degree: HashMap<EntityId, u32>,
    cross: HashMap<NameId, CrossStats>,
}

impl ClusterStats {
    /// Singleton cluster.
    pub fn singleton(name: NameId, entity: EntityId) -> Self {
        let mut nodes = BTreeSet::new();
        nodes.insert(entity);
        Self {
            name,
            nodes,
            pos_internal: 0,
            neg_internal: 0,
            incomp_internal: 0,
            pos_degree: HashMap::new(),
            cross: HashMap::new(),
        }
    }

    /// Name label.
    pub fn name(&self) -> NameId {
        self.name
    }

    /// Member entities, sorted.
    pub fn nodes(&self) -> &BTreeSet<EntityId> {
        &self.nodes
    }

    /// Number of member entities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a singleton-free cluster (never happens in practice;
    /// clusters always hold at least one node).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Internal POSITIVE edge count.
    pub fn pos_internal(&self) -> u32 {
        self.pos_internal
    }

    /// Internal NEGATIVE edge count. Nonzero means the cluster is
    /// inconsistent.
    pub fn neg_internal(&self) -> u32 {
        self.neg_internal
    }

    /// Internal INCOMPARABLE edge count.
    pub fn incomp_internal(&self) -> u32 {
        self.incomp_internal
    }

    /// Internal positive degree of one member.
    pub fn pos_degree(&self, entity: EntityId) -> u32 {
        self.pos_degree.get(&entity).copied().unwrap_or(0)
    }

    /// Cross-cluster counts toward `other`, if any evidence exists.
    pub fn cross(&self, other: NameId) -> Option<CrossStats> {
        self.cross.get(&other).copied()
    }

    /// Neighbor clusters with any cross evidence.
    pub fn cross_neighbors(&self) -> impl Iterator<Item = (NameId, CrossStats)> + '_ {
        self.cross.iter().map(|(n, s)| (*n, *s))
    }

    /// A cluster carries an inconsistency while it has at least one
    /// internal NEGATIVE edge.
    pub fn is_inconsistent(&self) -> bool {
        self.neg_internal > 0
    }

    /// Positive-redundancy check: every member's internal positive
    /// degree must reach `min(k, n - 1)`.
    ///
    /// This is the incremental necessary condition for k edges across
    /// every bipartition; it is exact for k = 1 and for clusters of at
    /// most k + 1 nodes.
    pub fn is_pos_redundant(&self, k: u32) -> bool {
        let n = self.nodes.len() as u32;
        if n <= 1 {
            return true;
        }
        let need = k.min(n - 1);
        self.nodes.iter().all(|e| self.pos_degree(*e) >= need)
    }
}

/// The partition of all known entities into clusters, plus counter
/// bookkeeping shared by redundancy and inconsistency queries.
#[derive(Debug, Default)]
pub struct ClusterIndex {
    assignment: HashMap<EntityId, NameId>,
    clusters: BTreeMap<NameId, ClusterStats>,
    next_name: u64,
}

impl ClusterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True when no entities are tracked.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Mint a fresh, never-used name label.
    pub fn fresh_name(&mut self) -> NameId {
        let name = NameId(self.next_name);
        self.next_name += 1;
        name
    }

    /// Insert a new entity as a singleton cluster.
    pub fn add_singleton(&mut self, entity: EntityId) -> NameId {
        let name = self.fresh_name();
        self.assignment.insert(entity, name);
        self.clusters
            .insert(name, ClusterStats::singleton(name, entity));
        name
    }

    /// Cluster label of an entity.
    pub fn name_of(&self, entity: EntityId) -> Option<NameId> {
        self.assignment.get(&entity).copied()
    }

    /// Cluster by label.
    pub fn get(&self, name: NameId) -> Option<&ClusterStats> {
        self.clusters.get(&name)
    }

    /// All clusters in label order.
    pub fn iter(&self) -> impl Iterator<Item = &ClusterStats> {
        self.clusters.values()
    }

    /// Labels of clusters currently flagged inconsistent.
    pub fn inconsistent(&self) -> Vec<NameId> {
        self.clusters
            .values()
            .filter(|c| c.is_inconsistent())
            .map(|c| c.name)
            .collect()
    }

    /// Negative-redundancy check for a cluster pair: at least `k`
    /// confirmed cross NEGATIVE edges.
    pub fn is_neg_redundant(&self, a: NameId, b: NameId, k: u32) -> bool {
        self.clusters
            .get(&a)
            .and_then(|c| c.cross(b))
            .map(|s| s.neg >= k)
            .unwrap_or(false)
    }

    /// Adjust an internal edge counter.
    pub fn bump_internal(&mut self, name: NameId, decision: Decision, delta: i32) {
        if let Some(c) = self.clusters.get_mut(&name) {
            let slot = match decision {
                Decision::Positive => &mut c.pos_internal,
                Decision::Negative => &mut c.neg_internal,
                Decision::Incomparable => &mut c.incomp_internal,
                Decision::Unreviewed | Decision::Unknown => return,
            };
            *slot = slot.checked_add_signed(delta).unwrap_or(0);
        }
    }

    /// Adjust a member's internal positive degree.
    pub fn bump_pos_degree(&mut self, name: NameId, entity: EntityId, delta: i32) {
        if let Some(c) = self.clusters.get_mut(&name) {
            let d = c.pos_degree.entry(entity).or_insert(0);
            *d = d.checked_add_signed(delta).unwrap_or(0);
        }
    }

    /// Adjust a cross-cluster counter, kept symmetric on both sides.
    pub fn bump_cross(&mut self, a: NameId, b: NameId, decision: Decision, delta: i32) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(c) = self.clusters.get_mut(&from) {
                let stats = c.cross.entry(to).or_default();
                stats.bump(decision, delta);
                if stats.is_empty() {
                    c.cross.remove(&to);
                }
            }
        }
    }

    /// Merge the clusters labeled `a` and `b`. The larger side keeps its
    /// label (ties go to the smaller label). Cross evidence between the
    /// two becomes internal; cross evidence toward third clusters is
    /// re-keyed. Cost is proportional to the smaller cluster and its
    /// cross neighbors, never the whole graph.
    ///
    /// Returns `(winner, absorbed)`.
    pub fn merge(&mut self, a: NameId, b: NameId) -> (NameId, NameId) {
        debug_assert_ne!(a, b);
        let (la, lb) = (
            self.clusters.get(&a).map(|c| c.len()).unwrap_or(0),
            self.clusters.get(&b).map(|c| c.len()).unwrap_or(0),
        );
        let (keep, absorb) = if la > lb || (la == lb && a < b) {
            (a, b)
        } else {
            (b, a)
        };

        let absorbed = match self.clusters.remove(&absorb) {
            Some(c) => c,
            None => return (keep, absorb),
        };

        // Reassign members.
        for &node in &absorbed.nodes {
            self.assignment.insert(node, keep);
        }

        // Detach the absorbed side's cross references from neighbors
        // before folding them into the keeper.
        let mut toward_keep = CrossStats::default();
        let mut third_party: Vec<(NameId, CrossStats)> = Vec::new();
        for (other, stats) in absorbed.cross {
            if other == keep {
                toward_keep = stats;
            } else {
                third_party.push((other, stats));
                if let Some(o) = self.clusters.get_mut(&other) {
                    o.cross.remove(&absorb);
                }
            }
        }

        let mut mirror: Vec<(NameId, CrossStats)> = Vec::with_capacity(third_party.len());
        {
            let keeper = self
                .clusters
                .get_mut(&keep)
                .expect("merge target must exist");
            keeper.nodes.extend(absorbed.nodes.iter().copied());
            keeper.pos_internal += absorbed.pos_internal;
            keeper.neg_internal += absorbed.neg_internal;
            keeper.incomp_internal += absorbed.incomp_internal;
            for (node, deg) in absorbed.pos_degree {
                *keeper.pos_degree.entry(node).or_insert(0) += deg;
            }

            // Evidence between the two halves becomes internal. Positive
            // cross edges merge eagerly, so none can have accumulated.
            debug_assert_eq!(toward_keep.pos, 0, "positive cross evidence must merge eagerly");
            keeper.cross.remove(&absorb);
            keeper.neg_internal += toward_keep.neg;
            keeper.incomp_internal += toward_keep.incomp;

            for (other, stats) in third_party {
                let entry = keeper.cross.entry(other).or_default();
                entry.pos += stats.pos;
                entry.neg += stats.neg;
                entry.incomp += stats.incomp;
                mirror.push((other, *entry));
            }
        }

        // Mirror the combined counts onto the neighbors once the keeper
        // borrow is released.
        for (other, merged) in mirror {
            if let Some(o) = self.clusters.get_mut(&other) {
                o.cross.insert(keep, merged);
            }
        }

        debug!(
            winner = %keep,
            absorbed = %absorb,
            "merged clusters"
        );
        (keep, absorb)
    }

    /// Remove a cluster wholesale (rebuild path). Cross references held
    /// by neighbors are dropped; member assignments are left to the
    /// caller, which reassigns every affected entity.
    pub fn remove_cluster(&mut self, name: NameId) -> Option<ClusterStats> {
        let cluster = self.clusters.remove(&name)?;
        for other in cluster.cross.keys() {
            if let Some(o) = self.clusters.get_mut(other) {
                o.cross.remove(&name);
            }
        }
        Some(cluster)
    }

    /// Insert a rebuilt cluster (rebuild path). Member assignments are
    /// updated; cross references are mirrored onto neighbors.
    pub fn insert_cluster(&mut self, cluster: ClusterStats) {
        for &node in &cluster.nodes {
            self.assignment.insert(node, cluster.name);
        }
        for (&other, &stats) in &cluster.cross {
            if let Some(o) = self.clusters.get_mut(&other) {
                o.cross.insert(cluster.name, stats);
            }
        }
        self.clusters.insert(cluster.name, cluster);
    }

    /// Build a cluster from parts (rebuild path).
    #[allow(clippy::too_many_arguments)]
    pub fn build_cluster(
        name: NameId,
        nodes: BTreeSet<EntityId>,
        pos_internal: u32,
        neg_internal: u32,
        incomp_internal: u32,
        pos_degree: HashMap<EntityId, u32>,
        cross: HashMap<NameId, CrossStats>,
    ) -> ClusterStats {
        ClusterStats {
            name,
            nodes,
            pos_internal,
            neg_internal,
            incomp_internal,
            pos_degree,
            cross,
        }
    }
}
