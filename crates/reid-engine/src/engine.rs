//! The review engine: one identity-inference session.
//!
//! Owns the evidence graph, the priority queue, the score cache, the
//! convergence criterion, and the append-only review log. All mutation
//! goes through [`ReviewEngine::apply_feedback`], which is atomic:
//! validation happens before any state change, and a rejected payload
//! leaves graph, queue, and log untouched.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use reid_core::{
    Decision, EngineParams, EntityId, Error, Feedback, Pair, ReviewLog, ReviewRecord, Result,
};
use reid_graph::{EdgeDelta, EvidenceGraph};

use crate::candidates::CandidateSource;
use crate::oracle::{PairProbs, ScoreOracle};
use crate::queue::PriorityQueue;
use crate::refresh::RefreshCriterion;

/// A candidate surfaced for review: the wire shape of `refresh` /
/// `continue_review` responses.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub edge: Pair,
    pub priority: f64,
    pub edge_data: serde_json::Value,
}

/// Introspection snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub num_entities: usize,
    pub num_edges: usize,
    pub num_clusters: usize,
    pub num_inconsistent: usize,
    pub queue_len: usize,
    pub refresh_estimate: f64,
    pub converged: bool,
    pub manual_reviews: u64,
    pub auto_reviews: u64,
}

/// One identity-inference session.
pub struct ReviewEngine {
    graph: EvidenceGraph,
    queue: PriorityQueue,
    params: EngineParams,
    refresh: RefreshCriterion,
    scores: HashMap<Pair, PairProbs>,
    scorer: Box<dyn ScoreOracle>,
    source: Box<dyn CandidateSource>,
    log: ReviewLog,
    manual_reviews: u64,
    auto_reviews: u64,
}

impl ReviewEngine {
    /// Build an idle session. Call [`ReviewEngine::start`] before
    /// anything else.
    pub fn new(
        params: EngineParams,
        scorer: Box<dyn ScoreOracle>,
        source: Box<dyn CandidateSource>,
        log: ReviewLog,
    ) -> Self {
        let refresh = RefreshCriterion::new(params.refresh);
        Self {
            graph: EvidenceGraph::new(),
            queue: PriorityQueue::new(),
            params,
            refresh,
            scores: HashMap::new(),
            scorer,
            source,
            log,
            manual_reviews: 0,
            auto_reviews: 0,
        }
    }

    /// Register the session's entities and replay any persisted review
    /// records onto the fresh graph, in timestamp order.
    pub fn start(&mut self, entities: &[EntityId]) -> Result<()> {
        self.graph.add_entities(entities)?;
        self.replay_log()?;
        info!(
            entity_count = self.graph.num_entities(),
            record_count = self.log.len(),
            "session started"
        );
        Ok(())
    }

    /// Rebuild graph state from the review log (reset-feedback
    /// semantics). Deterministic: records apply in (timestamp, id)
    /// order. Idempotent: replaying twice converges to the same state.
    pub fn replay(&mut self) -> Result<()> {
        let entities: Vec<EntityId> = self.graph.entities().collect();
        self.graph = EvidenceGraph::new();
        self.graph.add_entities(&entities)?;
        self.queue.clear();
        self.refresh.reset();
        self.replay_log()
    }

    fn replay_log(&mut self) -> Result<()> {
        let feedbacks: Vec<Feedback> = self
            .log
            .replay_order()
            .into_iter()
            .map(|r| r.feedback.clone())
            .collect();
        for fb in feedbacks {
            match self.graph.set_edge(&fb) {
                Ok(_) => {}
                Err(Error::UnknownEntity(id)) => {
                    // The log may cover a wider annotation set than this
                    // session; such records are simply out of scope.
                    warn!(entity_id = %id, edge = %fb.edge, "skipping out-of-scope record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Feedback
    // ------------------------------------------------------------------

    /// Apply one piece of evidence. Atomic: a malformed payload is
    /// rejected with [`Error::InvalidFeedback`] and nothing changes.
    pub fn apply_feedback(&mut self, feedback: Feedback) -> Result<EdgeDelta> {
        if feedback.evidence_decision == Decision::Unreviewed {
            return Err(Error::InvalidFeedback {
                pair: feedback.edge,
                reason: "evidence decision may not be 'unreviewed'; use remove_edge".to_string(),
            });
        }
        let delta = self.graph.set_edge(&feedback).map_err(|e| match e {
            Error::UnknownEntity(id) => Error::InvalidFeedback {
                pair: feedback.edge,
                reason: format!("unknown entity {id}"),
            },
            other => other,
        })?;

        self.log.append(feedback.clone())?;
        self.queue.suppress(&feedback.edge);
        self.refresh.observe(delta.is_meaningful());
        if feedback.user_id.is_auto() {
            self.auto_reviews += 1;
        } else {
            self.manual_reviews += 1;
        }
        debug!(
            edge = %feedback.edge,
            decision = %feedback.evidence_decision,
            user_id = %feedback.user_id,
            meaningful = delta.is_meaningful(),
            "applied feedback"
        );
        Ok(delta)
    }

    /// Correction path: demote a pair to unreviewed.
    pub fn remove_edge(&mut self, u: EntityId, v: EntityId) -> Result<EdgeDelta> {
        let delta = self.graph.remove_edge(u, v)?;
        self.queue.suppress(&Pair::new(u, v));
        Ok(delta)
    }

    /// Set or clear a manual priority override for a pair; overrides
    /// outrank classifier scores at the next queue refresh.
    pub fn set_priority_override(
        &mut self,
        u: EntityId,
        v: EntityId,
        priority: Option<f64>,
    ) -> Result<()> {
        self.graph.set_priority_override(u, v, priority)
    }

    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    /// Re-derive the candidate queue: pull pairs from the source, skip
    /// settled ones, score the rest (cached per pair), and enqueue at
    /// `max(positive score, manual override)`. Resets the convergence
    /// streak: a fresh batch means fresh uncertainty.
    pub async fn refresh_candidates(&mut self) -> Result<usize> {
        let pairs = self.source.candidate_pairs(&self.graph);
        let mut queued = 0;
        for pair in pairs {
            if self.is_settled(&pair)? {
                continue;
            }
            let probs = match self.scores.get(&pair) {
                Some(p) => *p,
                None => {
                    let p = self.scorer.probs(pair).await?;
                    self.scores.insert(pair, p);
                    p
                }
            };
            let override_priority = self
                .graph
                .get_edge(pair.lo(), pair.hi())
                .and_then(|r| r.priority_override);
            let priority = match override_priority {
                Some(o) => o.max(probs.priority()),
                None => probs.priority(),
            };
            self.queue.push(pair, priority);
            queued += 1;
        }
        self.refresh.reset();
        info!(candidate_count = queued, "refreshed candidates");
        Ok(queued)
    }

    /// Highest-priority unsettled candidate, or `None` when the queue
    /// is exhausted (session-level termination condition).
    pub fn pop_next(&mut self) -> Option<Candidate> {
        while let Some((pair, priority)) = self.queue.pop_next() {
            match self.is_settled(&pair) {
                Ok(true) => continue,
                Ok(false) => return Some(self.candidate(pair, priority)),
                Err(_) => continue,
            }
        }
        None
    }

    /// Return a popped candidate to the queue at its old priority.
    /// Used when the oracle produced no decision and the pair must stay
    /// eligible for retry.
    pub fn requeue(&mut self, candidate: &Candidate) {
        self.queue.push(candidate.edge, candidate.priority);
    }

    /// Up to `n` pending candidates in pop order, without consuming
    /// them.
    pub fn peek_candidates(&self, n: usize) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (pair, priority) in self.queue.peek_n(usize::MAX) {
            if out.len() >= n {
                break;
            }
            if let Ok(false) = self.is_settled(&pair) {
                out.push(self.candidate(pair, priority));
            }
        }
        out
    }

    /// Up to `manual.n_peek` pending candidates: the response shape of
    /// `refresh` and `continue_review`.
    pub fn continue_review(&self) -> Vec<Candidate> {
        self.peek_candidates(self.params.manual_n_peek)
    }

    /// A pair is settled when further evidence for it is unlikely to
    /// matter. A pair carrying a current reviewed decision is settled:
    /// re-confirming it adds nothing, and an unmet redundancy target
    /// solicits *other* edges between the same clusters. Unreviewed
    /// pairs are settled once their cluster (or cluster pair) reaches
    /// its redundancy target. Pairs inside inconsistent clusters are
    /// never settled.
    fn is_settled(&self, pair: &Pair) -> Result<bool> {
        let (u, v) = pair.endpoints();
        let nu = self.graph.name_of(u)?;
        let nv = self.graph.name_of(v)?;
        let reviewed = self
            .graph
            .get_edge(u, v)
            .map(|r| r.decision.is_reviewed())
            .unwrap_or(false);
        if nu == nv {
            let cluster = self
                .graph
                .cluster(nu)
                .ok_or_else(|| Error::Internal(format!("dangling cluster label {nu}")))?;
            if cluster.is_inconsistent() {
                return Ok(false);
            }
            Ok(reviewed || cluster.is_pos_redundant(self.params.redun.pos))
        } else {
            Ok(reviewed || self.graph.is_neg_redundant(nu, nv, self.params.redun.neg))
        }
    }

    fn candidate(&self, pair: Pair, priority: f64) -> Candidate {
        let (u, v) = pair.endpoints();
        let record = self.graph.get_edge(u, v);
        let status = self.graph.pair_status(u, v).ok();
        let probs = self.scores.get(&pair);
        Candidate {
            edge: pair,
            priority,
            edge_data: json!({
                "decision": record.map(|r| r.decision),
                "tags": record.map(|r| r.tags.clone()).unwrap_or_default(),
                "status": status,
                "probs": probs,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Advisory convergence signal from the refresh criterion.
    pub fn converged(&self) -> bool {
        self.refresh.converged()
    }

    /// Session snapshot.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            num_entities: self.graph.num_entities(),
            num_edges: self.graph.num_edges(),
            num_clusters: self.graph.num_clusters(),
            num_inconsistent: self.graph.inconsistent_clusters().len(),
            queue_len: self.queue.len(),
            refresh_estimate: self.refresh.estimate(),
            converged: self.converged(),
            manual_reviews: self.manual_reviews,
            auto_reviews: self.auto_reviews,
        }
    }

    /// Applied review records, arrival order.
    pub fn logs(&self) -> &[ReviewRecord] {
        self.log.records()
    }

    /// The underlying evidence graph (read-only).
    pub fn graph(&self) -> &EvidenceGraph {
        &self.graph
    }

    /// Session parameters.
    pub fn params(&self) -> &EngineParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::AllPairs;
    use crate::oracle::MockScoreOracle;
    use reid_core::UserId;

    fn engine_with(ids: &[i64]) -> ReviewEngine {
        let mut engine = ReviewEngine::new(
            EngineParams::default().with_redun(1, 1),
            Box::new(MockScoreOracle::new()),
            Box::new(AllPairs),
            ReviewLog::in_memory(),
        );
        let ids: Vec<EntityId> = ids.iter().map(|&i| EntityId(i)).collect();
        engine.start(&ids).unwrap();
        engine
    }

    fn feedback(u: i64, v: i64, d: Decision) -> Feedback {
        Feedback::new(Pair::new(u, v), d, UserId::user("test"))
    }

    #[test]
    fn unreviewed_feedback_is_invalid() {
        let mut engine = engine_with(&[1, 2]);
        let err = engine
            .apply_feedback(feedback(1, 2, Decision::Unreviewed))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFeedback { .. }));
        assert_eq!(engine.logs().len(), 0);
    }

    #[test]
    fn unknown_entity_feedback_is_invalid_and_unlogged() {
        let mut engine = engine_with(&[1, 2]);
        let err = engine
            .apply_feedback(feedback(1, 42, Decision::Positive))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFeedback { .. }));
        assert_eq!(engine.logs().len(), 0);
        assert_eq!(engine.graph().num_edges(), 0);
    }

    #[test]
    fn manual_and_auto_reviews_counted() {
        let mut engine = engine_with(&[1, 2, 3]);
        engine
            .apply_feedback(feedback(1, 2, Decision::Positive))
            .unwrap();
        engine
            .apply_feedback(Feedback::new(
                Pair::new(1, 3),
                Decision::Negative,
                UserId::auto("vamp"),
            ))
            .unwrap();
        let status = engine.status();
        assert_eq!(status.manual_reviews, 1);
        assert_eq!(status.auto_reviews, 1);
    }

    #[tokio::test]
    async fn settled_pairs_are_not_queued() {
        let mut engine = engine_with(&[1, 2, 3]);
        // With redun = 1, one positive settles {1,2} and one negative
        // settles the cluster pair.
        engine
            .apply_feedback(feedback(1, 2, Decision::Positive))
            .unwrap();
        engine
            .apply_feedback(feedback(1, 3, Decision::Negative))
            .unwrap();
        let queued = engine.refresh_candidates().await.unwrap();
        assert_eq!(queued, 0);
        assert!(engine.pop_next().is_none());
    }

    #[tokio::test]
    async fn unsettled_pairs_surface_in_priority_order() {
        let mut engine = ReviewEngine::new(
            EngineParams::default().with_redun(1, 1),
            Box::new(
                MockScoreOracle::new()
                    .with_default(PairProbs {
                        p_positive: 0.2,
                        p_negative: 0.7,
                        p_incomparable: 0.1,
                    })
                    .with_pair(
                        Pair::new(1, 2),
                        PairProbs {
                            p_positive: 0.95,
                            p_negative: 0.04,
                            p_incomparable: 0.01,
                        },
                    ),
            ),
            Box::new(AllPairs),
            ReviewLog::in_memory(),
        );
        engine
            .start(&[EntityId(1), EntityId(2), EntityId(3)])
            .unwrap();
        let queued = engine.refresh_candidates().await.unwrap();
        assert_eq!(queued, 3);
        let first = engine.pop_next().unwrap();
        assert_eq!(first.edge, Pair::new(1, 2));
        assert!((first.priority - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    async fn decided_pairs_leave_the_candidate_set() {
        // redun.neg = 2 can never be met between singleton clusters;
        // the decided pair must still drop out of review.
        let mut engine = ReviewEngine::new(
            EngineParams::default(),
            Box::new(MockScoreOracle::new()),
            Box::new(AllPairs),
            ReviewLog::in_memory(),
        );
        engine
            .start(&[EntityId(1), EntityId(2), EntityId(3)])
            .unwrap();
        engine
            .apply_feedback(feedback(1, 2, Decision::Negative))
            .unwrap();
        let queued = engine.refresh_candidates().await.unwrap();
        assert_eq!(queued, 2);
        while let Some(c) = engine.pop_next() {
            assert_ne!(c.edge, Pair::new(1, 2));
        }
        assert!(engine.continue_review().is_empty());
    }

    #[tokio::test]
    async fn contested_pairs_stay_in_review() {
        let mut engine = engine_with(&[1, 2]);
        engine
            .apply_feedback(feedback(1, 2, Decision::Positive))
            .unwrap();
        engine
            .apply_feedback(feedback(1, 2, Decision::Negative))
            .unwrap();
        // The cluster is flagged inconsistent; its pair must come back
        // for resolving review even though it carries a decision.
        let queued = engine.refresh_candidates().await.unwrap();
        assert_eq!(queued, 1);
        assert_eq!(engine.pop_next().unwrap().edge, Pair::new(1, 2));
    }

    #[tokio::test]
    async fn requeued_candidate_is_popped_again() {
        let mut engine = engine_with(&[1, 2]);
        engine.refresh_candidates().await.unwrap();
        let c = engine.pop_next().unwrap();
        assert!(engine.pop_next().is_none());
        engine.requeue(&c);
        assert_eq!(engine.pop_next().unwrap().edge, c.edge);
    }

    #[tokio::test]
    async fn manual_override_outranks_scores() {
        let mut engine = engine_with(&[1, 2, 3]);
        engine
            .set_priority_override(EntityId(2), EntityId(3), Some(2.0))
            .unwrap();
        engine.refresh_candidates().await.unwrap();
        let first = engine.pop_next().unwrap();
        assert_eq!(first.edge, Pair::new(2, 3));
        assert!((first.priority - 2.0).abs() < 1e-9);
    }

    #[test]
    fn replay_is_deterministic_and_idempotent() {
        let mut engine = engine_with(&[10, 11, 12, 13]);
        engine
            .apply_feedback(feedback(10, 11, Decision::Positive))
            .unwrap();
        engine
            .apply_feedback(feedback(12, 13, Decision::Positive))
            .unwrap();
        engine
            .apply_feedback(feedback(11, 12, Decision::Negative))
            .unwrap();
        let before: Vec<Vec<i64>> = engine
            .graph()
            .connected_components()
            .map(|c| c.iter().map(|e| e.0).collect())
            .collect();

        engine.replay().unwrap();
        let after: Vec<Vec<i64>> = engine
            .graph()
            .connected_components()
            .map(|c| c.iter().map(|e| e.0).collect())
            .collect();
        assert_eq!(before, after);

        engine.replay().unwrap();
        let again: Vec<Vec<i64>> = engine
            .graph()
            .connected_components()
            .map(|c| c.iter().map(|e| e.0).collect())
            .collect();
        assert_eq!(before, again);
    }
}
