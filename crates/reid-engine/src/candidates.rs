//! Candidate pair sources.
//!
//! Where candidate edges come from is an external concern (a ranking
//! matcher in production); the engine only needs *some* pair stream to
//! score and filter. [`AllPairs`] is the exhaustive default used by the
//! harness and tests.

use reid_core::{EntityId, Pair};
use reid_graph::EvidenceGraph;

/// Source of candidate pairs for scoring and review.
pub trait CandidateSource: Send {
    /// Candidate pairs under the current graph state. Order must be
    /// deterministic; the engine handles deduplication and filtering.
    fn candidate_pairs(&mut self, graph: &EvidenceGraph) -> Vec<Pair>;
}

/// Exhaustive candidate source: every unordered pair of known entities,
/// in sorted order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairs;

impl CandidateSource for AllPairs {
    fn candidate_pairs(&mut self, graph: &EvidenceGraph) -> Vec<Pair> {
        let ids: Vec<EntityId> = graph.entities().collect();
        let mut out = Vec::with_capacity(ids.len().saturating_mul(ids.len().saturating_sub(1)) / 2);
        for (i, &u) in ids.iter().enumerate() {
            for &v in &ids[i + 1..] {
                out.push(Pair::new(u, v));
            }
        }
        out
    }
}
