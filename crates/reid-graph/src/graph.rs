//! The entity/evidence graph.
//!
//! One [`EdgeRecord`] per reviewed pair, plus the dynamic cluster index
//! derived from the positive subgraph. All mutations go through
//! [`EvidenceGraph::set_edge`] / [`EvidenceGraph::remove_edge`], which
//! validate first and mutate second so a rejected apply leaves the
//! graph untouched.
//!
//! Cluster dynamics:
//! - a new POSITIVE edge across two clusters merges them (incremental,
//!   proportional to the smaller side);
//! - downgrading a POSITIVE edge to unreviewed/incomparable rechecks
//!   connectivity within the old cluster and splits it if broken (the
//!   one O(|cluster|) path, splits are rare);
//! - a NEGATIVE decision inside a cluster does *not* split it: the
//!   cluster is flagged inconsistent and held together until review
//!   resolves the contradiction.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use reid_core::{Decision, EntityId, Error, Feedback, NameId, Pair, PairStatus, Result};

use crate::cluster::{ClusterIndex, ClusterStats, CrossStats};
use crate::edge::EdgeRecord;
use crate::union_find::UnionFind;

/// What one edge mutation did to the graph.
///
/// The refresh criterion treats a delta as "meaningful" when it changed
/// the clustering or the inconsistency set; redundant confirmations are
/// exactly the non-meaningful ones.
#[derive(Debug, Clone, Default)]
pub struct EdgeDelta {
    /// The mutated pair.
    pub pair: Option<Pair>,
    /// Decision that was replaced.
    pub old_decision: Decision,
    /// Decision now authoritative.
    pub new_decision: Decision,
    /// `(winner, absorbed)` labels when two clusters merged.
    pub merged: Option<(NameId, NameId)>,
    /// Labels of the surviving clusters when one split.
    pub split: Option<Vec<NameId>>,
    /// An inconsistency flag was raised by this mutation.
    pub inconsistency_raised: bool,
    /// An inconsistency flag was cleared by this mutation.
    pub inconsistency_cleared: bool,
}

impl EdgeDelta {
    /// True when the mutation changed clustering or the inconsistency
    /// set — the signal the convergence estimator feeds on.
    pub fn is_meaningful(&self) -> bool {
        self.merged.is_some()
            || self.split.is_some()
            || self.inconsistency_raised
            || self.inconsistency_cleared
    }
}

/// Undirected evidence graph over externally supplied entity ids.
#[derive(Debug, Default)]
pub struct EvidenceGraph {
    edges: HashMap<Pair, EdgeRecord>,
    adjacency: HashMap<EntityId, BTreeSet<EntityId>>,
    clusters: ClusterIndex,
}

impl EvidenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Insert new entities as singleton clusters.
    ///
    /// Fails with [`Error::DuplicateEntity`] if any id is already
    /// present; nothing is inserted in that case.
    pub fn add_entities(&mut self, ids: &[EntityId]) -> Result<()> {
        for &id in ids {
            if self.adjacency.contains_key(&id) {
                return Err(Error::DuplicateEntity(id));
            }
        }
        let mut seen = BTreeSet::new();
        for &id in ids {
            if !seen.insert(id) {
                return Err(Error::DuplicateEntity(id));
            }
        }
        for &id in ids {
            self.adjacency.insert(id, BTreeSet::new());
            self.clusters.add_singleton(id);
        }
        debug!(added = ids.len(), entity_count = self.adjacency.len(), "added entities");
        Ok(())
    }

    /// True if the entity is known.
    pub fn contains(&self, id: EntityId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// All known entities, sorted.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        let mut ids: Vec<EntityId> = self.adjacency.keys().copied().collect();
        ids.sort();
        ids.into_iter()
    }

    /// Number of known entities.
    pub fn num_entities(&self) -> usize {
        self.adjacency.len()
    }

    // ------------------------------------------------------------------
    // Edge lookup
    // ------------------------------------------------------------------

    /// Review record for a pair, order-independent.
    pub fn get_edge(&self, u: EntityId, v: EntityId) -> Option<&EdgeRecord> {
        self.edges.get(&Pair::new(u, v))
    }

    /// True if the pair has ever received evidence.
    pub fn has_edge(&self, u: EntityId, v: EntityId) -> bool {
        self.edges.contains_key(&Pair::new(u, v))
    }

    /// All edge records (any decision, including demoted ones).
    pub fn edge_records(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.edges.values()
    }

    /// Number of pairs with any recorded evidence.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    // ------------------------------------------------------------------
    // Clusters
    // ------------------------------------------------------------------

    /// Current clusters as a lazy, finite, restartable sequence of
    /// entity sets (label order).
    pub fn connected_components(&self) -> impl Iterator<Item = &BTreeSet<EntityId>> {
        self.clusters.iter().map(|c| c.nodes())
    }

    /// Cluster label of an entity.
    pub fn name_of(&self, id: EntityId) -> Result<NameId> {
        self.clusters.name_of(id).ok_or(Error::UnknownEntity(id))
    }

    /// Cluster stats by label.
    pub fn cluster(&self, name: NameId) -> Option<&ClusterStats> {
        self.clusters.get(name)
    }

    /// All clusters in label order.
    pub fn clusters(&self) -> impl Iterator<Item = &ClusterStats> {
        self.clusters.iter()
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Labels of clusters currently flagged inconsistent.
    pub fn inconsistent_clusters(&self) -> Vec<NameId> {
        self.clusters.inconsistent()
    }

    /// Positive-redundancy check for one cluster.
    pub fn is_pos_redundant(&self, name: NameId, k: u32) -> bool {
        self.clusters
            .get(name)
            .map(|c| c.is_pos_redundant(k))
            .unwrap_or(false)
    }

    /// Negative-redundancy check for a cluster pair.
    pub fn is_neg_redundant(&self, a: NameId, b: NameId, k: u32) -> bool {
        self.clusters.is_neg_redundant(a, b, k)
    }

    /// Derived per-pair state: the raw decision, overridden by
    /// `Inconsistent` while the surrounding cluster state contradicts
    /// it.
    pub fn pair_status(&self, u: EntityId, v: EntityId) -> Result<PairStatus> {
        let nu = self.name_of(u)?;
        let nv = self.name_of(v)?;
        if nu == nv {
            if let Some(c) = self.clusters.get(nu) {
                if c.is_inconsistent() {
                    return Ok(PairStatus::Inconsistent);
                }
            }
        } else if let Some(c) = self.clusters.get(nu) {
            if let Some(stats) = c.cross(nv) {
                if stats.pos > 0 && stats.neg > 0 {
                    return Ok(PairStatus::Inconsistent);
                }
            }
        }
        let decision = self
            .edges
            .get(&Pair::new(u, v))
            .map(|r| r.decision)
            .unwrap_or(Decision::Unreviewed);
        Ok(match decision {
            Decision::Positive => PairStatus::Positive,
            Decision::Negative => PairStatus::Negative,
            Decision::Incomparable => PairStatus::Incomparable,
            Decision::Unreviewed | Decision::Unknown => PairStatus::Unreviewed,
        })
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Upsert the authoritative decision for a pair.
    ///
    /// Validation happens before any mutation: a self-pair is rejected
    /// with [`Error::InvalidFeedback`] and unknown endpoints with
    /// [`Error::UnknownEntity`], leaving the graph unmodified.
    pub fn set_edge(&mut self, feedback: &Feedback) -> Result<EdgeDelta> {
        let pair = feedback.edge;
        if pair.is_self_pair() {
            return Err(Error::InvalidFeedback {
                pair,
                reason: "self-pair edge".to_string(),
            });
        }
        let (u, v) = pair.endpoints();
        for id in [u, v] {
            if !self.contains(id) {
                return Err(Error::UnknownEntity(id));
            }
        }

        let record = self
            .edges
            .entry(pair)
            .or_insert_with(|| EdgeRecord::new(pair));
        let old = record.apply(feedback);
        let new = feedback.evidence_decision;
        self.adjacency.entry(u).or_default().insert(v);
        self.adjacency.entry(v).or_default().insert(u);

        debug!(
            edge = %pair,
            old_decision = %old,
            new_decision = %new,
            user_id = %feedback.user_id,
            "set edge"
        );
        Ok(self.transition(pair, old, new))
    }

    /// Demote a pair to unreviewed (correction path). History is kept;
    /// cluster connectivity is recomputed for the affected component.
    pub fn remove_edge(&mut self, u: EntityId, v: EntityId) -> Result<EdgeDelta> {
        for id in [u, v] {
            if !self.contains(id) {
                return Err(Error::UnknownEntity(id));
            }
        }
        let pair = Pair::new(u, v);
        let old = match self.edges.get_mut(&pair) {
            Some(record) => record.demote(),
            None => return Ok(EdgeDelta::default()),
        };
        debug!(edge = %pair, old_decision = %old, "removed edge");
        Ok(self.transition(pair, old, Decision::Unreviewed))
    }

    /// Set or clear a manual priority override for a pair, creating the
    /// record lazily.
    pub fn set_priority_override(
        &mut self,
        u: EntityId,
        v: EntityId,
        priority: Option<f64>,
    ) -> Result<()> {
        for id in [u, v] {
            if !self.contains(id) {
                return Err(Error::UnknownEntity(id));
            }
        }
        let pair = Pair::new(u, v);
        let record = self
            .edges
            .entry(pair)
            .or_insert_with(|| EdgeRecord::new(pair));
        record.priority_override = priority;
        self.adjacency.entry(u).or_default().insert(v);
        self.adjacency.entry(v).or_default().insert(u);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transition core
    // ------------------------------------------------------------------

    /// Propagate a decision change through the cluster index.
    /// Precondition: both endpoints are known and the edge record is
    /// already updated.
    fn transition(&mut self, pair: Pair, old: Decision, new: Decision) -> EdgeDelta {
        let mut delta = EdgeDelta {
            pair: Some(pair),
            old_decision: old,
            new_decision: new,
            ..Default::default()
        };
        if old == new {
            // Idempotent re-review: metadata refreshed, state unchanged.
            return delta;
        }

        let (u, v) = pair.endpoints();
        let nu = self.clusters.name_of(u).expect("endpoint is known");
        let nv = self.clusters.name_of(v).expect("endpoint is known");
        let incons_before = self.inconsistent_near(nu, nv);

        // Retract the old decision's contribution.
        if old.is_reviewed() {
            if nu == nv {
                self.clusters.bump_internal(nu, old, -1);
                if old == Decision::Positive {
                    self.clusters.bump_pos_degree(nu, u, -1);
                    self.clusters.bump_pos_degree(nu, v, -1);
                }
            } else {
                self.clusters.bump_cross(nu, nv, old, -1);
            }
        }

        // A retracted positive inside one cluster may break
        // connectivity. A negative replacement skips the split: the
        // contradiction flags the cluster instead of tearing it apart.
        if old == Decision::Positive && nu == nv && new != Decision::Negative {
            let names = self.rebuild_region(nu);
            if names.len() > 1 {
                delta.split = Some(names);
            }
        }

        // Labels may have changed during the rebuild.
        let nu = self.clusters.name_of(u).expect("endpoint is known");
        let nv = self.clusters.name_of(v).expect("endpoint is known");

        // Add the new decision's contribution.
        if new.is_reviewed() {
            if nu == nv {
                self.clusters.bump_internal(nu, new, 1);
                if new == Decision::Positive {
                    self.clusters.bump_pos_degree(nu, u, 1);
                    self.clusters.bump_pos_degree(nu, v, 1);
                }
            } else if new == Decision::Positive {
                let (keep, absorbed) = self.clusters.merge(nu, nv);
                self.clusters.bump_internal(keep, Decision::Positive, 1);
                self.clusters.bump_pos_degree(keep, u, 1);
                self.clusters.bump_pos_degree(keep, v, 1);
                delta.merged = Some((keep, absorbed));
                info!(
                    edge = %pair,
                    name_id = %keep,
                    cluster_count = self.clusters.len(),
                    "merged clusters"
                );
            } else {
                self.clusters.bump_cross(nu, nv, new, 1);
            }
        }

        // Retracting the last internal negative releases the hold on an
        // inconsistent cluster; its halves may no longer be positively
        // connected.
        if old == Decision::Negative {
            if let Some(name) = self.clusters.name_of(u) {
                let resolved = self
                    .clusters
                    .get(name)
                    .map(|c| !c.is_inconsistent() && c.nodes().contains(&v))
                    .unwrap_or(false);
                if resolved {
                    let names = self.rebuild_region(name);
                    if names.len() > 1 && delta.split.is_none() {
                        delta.split = Some(names);
                    }
                }
            }
        }

        let nu = self.clusters.name_of(u).expect("endpoint is known");
        let nv = self.clusters.name_of(v).expect("endpoint is known");
        let incons_after = self.inconsistent_near(nu, nv);
        delta.inconsistency_raised = incons_after > incons_before;
        delta.inconsistency_cleared = incons_after < incons_before;
        if delta.inconsistency_raised {
            info!(edge = %pair, "inconsistency raised");
        }
        if delta.inconsistency_cleared {
            info!(edge = %pair, "inconsistency cleared");
        }
        if delta.split.is_some() {
            info!(
                edge = %pair,
                cluster_count = self.clusters.len(),
                "split cluster"
            );
        }
        delta
    }

    /// Inconsistency flags on the clusters around a pair (0, 1 or 2).
    fn inconsistent_near(&self, nu: NameId, nv: NameId) -> u32 {
        let mut count = 0;
        for name in if nu == nv { vec![nu] } else { vec![nu, nv] } {
            if self
                .clusters
                .get(name)
                .map(|c| c.is_inconsistent())
                .unwrap_or(false)
            {
                count += 1;
            }
        }
        count
    }

    /// Recompute positive connectivity strictly within one cluster's
    /// node set and rebuild it if it is no longer connected. Returns the
    /// labels covering the old node set (a single label when nothing
    /// split).
    ///
    /// This is the one deliberately non-incremental path: O(nodes +
    /// edges of the old cluster).
    fn rebuild_region(&mut self, name: NameId) -> Vec<NameId> {
        let nodes: Vec<EntityId> = match self.clusters.get(name) {
            Some(c) => c.nodes().iter().copied().collect(),
            None => return Vec::new(),
        };
        if nodes.len() <= 1 {
            return vec![name];
        }

        let index_of: HashMap<EntityId, usize> =
            nodes.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        let mut uf = UnionFind::new(nodes.len());
        for (&e, &i) in &index_of {
            if let Some(neigh) = self.adjacency.get(&e) {
                for &m in neigh {
                    if let Some(&j) = index_of.get(&m) {
                        if i < j && self.decision_of(e, m) == Decision::Positive {
                            uf.union(i, j);
                        }
                    }
                }
            }
        }
        let comps = uf.components();
        if comps.len() == 1 {
            return vec![name];
        }

        // Broken: rebuild each component from its actual edges.
        let region: BTreeSet<EntityId> = nodes.iter().copied().collect();
        let mut comp_sets: Vec<BTreeSet<EntityId>> = comps
            .into_iter()
            .map(|c| c.into_iter().map(|i| nodes[i]).collect())
            .collect();
        // Largest component keeps the old label.
        comp_sets.sort_by_key(|c| std::cmp::Reverse(c.len()));

        self.clusters.remove_cluster(name);
        let mut new_name_of: HashMap<EntityId, NameId> = HashMap::new();
        let mut assigned: Vec<(NameId, BTreeSet<EntityId>)> = Vec::new();
        for (i, comp) in comp_sets.into_iter().enumerate() {
            let label = if i == 0 {
                name
            } else {
                self.clusters.fresh_name()
            };
            for &node in &comp {
                new_name_of.insert(node, label);
            }
            assigned.push((label, comp));
        }

        let labels: Vec<NameId> = assigned.iter().map(|(l, _)| *l).collect();
        for (label, comp) in assigned {
            let mut pos_internal = 0;
            let mut neg_internal = 0;
            let mut incomp_internal = 0;
            let mut pos_degree: HashMap<EntityId, u32> = HashMap::new();
            let mut cross: HashMap<NameId, CrossStats> = HashMap::new();
            for &n in &comp {
                let Some(neigh) = self.adjacency.get(&n) else {
                    continue;
                };
                for &m in neigh {
                    let d = self.decision_of(n, m);
                    if !d.is_reviewed() {
                        continue;
                    }
                    if comp.contains(&m) {
                        if n < m {
                            match d {
                                Decision::Positive => {
                                    pos_internal += 1;
                                    *pos_degree.entry(n).or_insert(0) += 1;
                                    *pos_degree.entry(m).or_insert(0) += 1;
                                }
                                Decision::Negative => neg_internal += 1,
                                Decision::Incomparable => incomp_internal += 1,
                                _ => {}
                            }
                        }
                    } else {
                        let other = if region.contains(&m) {
                            new_name_of.get(&m).copied()
                        } else {
                            self.clusters.name_of(m)
                        };
                        if let Some(other) = other {
                            let stats = cross.entry(other).or_default();
                            match d {
                                Decision::Positive => stats.pos += 1,
                                Decision::Negative => stats.neg += 1,
                                Decision::Incomparable => stats.incomp += 1,
                                _ => {}
                            }
                        }
                    }
                }
            }
            self.clusters.insert_cluster(ClusterIndex::build_cluster(
                label,
                comp,
                pos_internal,
                neg_internal,
                incomp_internal,
                pos_degree,
                cross,
            ));
        }
        labels
    }

    fn decision_of(&self, u: EntityId, v: EntityId) -> Decision {
        self.edges
            .get(&Pair::new(u, v))
            .map(|r| r.decision)
            .unwrap_or(Decision::Unreviewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reid_core::UserId;

    fn graph_with(ids: &[i64]) -> EvidenceGraph {
        let mut g = EvidenceGraph::new();
        let ids: Vec<EntityId> = ids.iter().map(|&i| EntityId(i)).collect();
        g.add_entities(&ids).unwrap();
        g
    }

    fn feedback(u: i64, v: i64, d: Decision) -> Feedback {
        Feedback::new(Pair::new(u, v), d, UserId::user("test"))
    }

    #[test]
    fn duplicate_entity_rejected_atomically() {
        let mut g = graph_with(&[1, 2]);
        let err = g.add_entities(&[EntityId(3), EntityId(1)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(EntityId(1))));
        // Nothing from the failed batch was inserted.
        assert!(!g.contains(EntityId(3)));
    }

    #[test]
    fn unknown_entity_rejected() {
        let mut g = graph_with(&[1, 2]);
        let err = g.set_edge(&feedback(1, 99, Decision::Positive)).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(EntityId(99))));
        assert_eq!(g.num_edges(), 0);
    }

    #[test]
    fn self_pair_rejected() {
        let mut g = graph_with(&[1]);
        let err = g.set_edge(&feedback(1, 1, Decision::Positive)).unwrap_err();
        assert!(matches!(err, Error::InvalidFeedback { .. }));
    }

    #[test]
    fn edge_lookup_is_symmetric() {
        let mut g = graph_with(&[1, 2]);
        g.set_edge(&feedback(2, 1, Decision::Positive)).unwrap();
        assert!(g.has_edge(EntityId(1), EntityId(2)));
        assert!(g.has_edge(EntityId(2), EntityId(1)));
        let a = g.get_edge(EntityId(1), EntityId(2)).unwrap().decision;
        let b = g.get_edge(EntityId(2), EntityId(1)).unwrap().decision;
        assert_eq!(a, b);
    }

    #[test]
    fn positive_edge_merges_components() {
        let mut g = graph_with(&[1, 2, 3, 4]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(3, 4, Decision::Positive)).unwrap();
        assert_eq!(g.num_clusters(), 2);
        let delta = g.set_edge(&feedback(2, 3, Decision::Positive)).unwrap();
        assert!(delta.merged.is_some());
        assert_eq!(g.num_clusters(), 1);
        let comp = g.connected_components().next().unwrap();
        let ids: Vec<i64> = comp.iter().map(|e| e.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn components_form_partition() {
        let mut g = graph_with(&[1, 2, 3, 4, 5]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(4, 5, Decision::Positive)).unwrap();
        g.set_edge(&feedback(2, 4, Decision::Negative)).unwrap();
        let mut seen = BTreeSet::new();
        let mut total = 0;
        for comp in g.connected_components() {
            for &e in comp {
                assert!(seen.insert(e), "entity {e} appears in two components");
                total += 1;
            }
        }
        assert_eq!(total, g.num_entities());
    }

    #[test]
    fn idempotent_reapply() {
        let mut g = graph_with(&[1, 2, 3]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        let name = g.name_of(EntityId(1)).unwrap();
        let pos = g.cluster(name).unwrap().pos_internal();
        let delta = g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        assert!(!delta.is_meaningful());
        assert_eq!(g.cluster(name).unwrap().pos_internal(), pos);
        assert_eq!(g.num_clusters(), 2);
    }

    #[test]
    fn removing_bridge_splits_cluster() {
        let mut g = graph_with(&[1, 2, 3]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(2, 3, Decision::Positive)).unwrap();
        assert_eq!(g.num_clusters(), 1);
        let old_name = g.name_of(EntityId(1)).unwrap();

        let delta = g.remove_edge(EntityId(2), EntityId(3)).unwrap();
        assert!(delta.split.is_some());
        assert_eq!(g.num_clusters(), 2);
        // {1,2} is the larger survivor and keeps the label.
        assert_eq!(g.name_of(EntityId(1)).unwrap(), old_name);
        assert_eq!(g.name_of(EntityId(2)).unwrap(), old_name);
        assert_ne!(g.name_of(EntityId(3)).unwrap(), old_name);
    }

    #[test]
    fn internal_negative_flags_inconsistency_without_split() {
        let mut g = graph_with(&[1, 2]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        let delta = g.set_edge(&feedback(1, 2, Decision::Negative)).unwrap();
        assert!(delta.inconsistency_raised);
        // The contradiction holds the cluster together.
        assert_eq!(g.num_clusters(), 1);
        assert_eq!(g.inconsistent_clusters().len(), 1);
        assert_eq!(
            g.pair_status(EntityId(1), EntityId(2)).unwrap(),
            PairStatus::Inconsistent
        );
    }

    #[test]
    fn resolving_inconsistency_releases_cluster() {
        let mut g = graph_with(&[1, 2]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(1, 2, Decision::Negative)).unwrap();
        // Correction: demote the contested edge entirely.
        let delta = g.remove_edge(EntityId(1), EntityId(2)).unwrap();
        assert!(delta.inconsistency_cleared);
        assert_eq!(g.inconsistent_clusters().len(), 0);
        // No positive evidence remains; the cluster falls apart.
        assert_eq!(g.num_clusters(), 2);
    }

    #[test]
    fn merge_across_negative_evidence_flags_merged_cluster() {
        let mut g = graph_with(&[1, 2, 3, 4]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(3, 4, Decision::Positive)).unwrap();
        g.set_edge(&feedback(1, 3, Decision::Negative)).unwrap();
        // Positive across the negatively-linked clusters: merge goes
        // through and the contradiction surfaces as inconsistency.
        let delta = g.set_edge(&feedback(2, 4, Decision::Positive)).unwrap();
        assert!(delta.merged.is_some());
        assert!(delta.inconsistency_raised);
        assert_eq!(g.num_clusters(), 1);
        assert_eq!(g.inconsistent_clusters().len(), 1);
    }

    #[test]
    fn split_rebuild_restores_cross_counters() {
        let mut g = graph_with(&[1, 2, 3, 4]);
        g.set_edge(&feedback(1, 2, Decision::Positive)).unwrap();
        g.set_edge(&feedback(2, 3, Decision::Positive)).unwrap();
        g.set_edge(&feedback(3, 4, Decision::Negative)).unwrap();
        // Split {1,2,3} into {1,2} and {3}; the negative toward 4 must
        // follow 3 into its new cluster.
        g.remove_edge(EntityId(2), EntityId(3)).unwrap();
        let n3 = g.name_of(EntityId(3)).unwrap();
        let n4 = g.name_of(EntityId(4)).unwrap();
        assert!(g.is_neg_redundant(n3, n4, 1));
        let n1 = g.name_of(EntityId(1)).unwrap();
        assert!(!g.is_neg_redundant(n1, n4, 1));
    }

    #[test]
    fn pos_redundancy_counts_once_per_pair() {
        let mut g = graph_with(&[10, 11, 12, 13]);
        g.set_edge(&feedback(10, 11, Decision::Positive)).unwrap();
        g.set_edge(&feedback(12, 13, Decision::Positive)).unwrap();
        g.set_edge(&feedback(11, 12, Decision::Negative)).unwrap();
        // Re-confirming an existing decision must not double-count.
        g.set_edge(&feedback(10, 11, Decision::Positive)).unwrap();
        let a = g.name_of(EntityId(10)).unwrap();
        let b = g.name_of(EntityId(12)).unwrap();
        assert_eq!(g.cluster(a).unwrap().pos_internal(), 1);
        assert_eq!(g.cluster(b).unwrap().pos_internal(), 1);
        assert_eq!(g.cluster(a).unwrap().cross(b).unwrap().neg, 1);
        assert!(g.inconsistent_clusters().is_empty());
        assert_eq!(g.num_clusters(), 2);
    }
}
