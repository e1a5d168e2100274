//! Review/simulation harness.
//!
//! Drives the review loop end to end: pop the next candidate, ask the
//! decision oracle, apply the feedback, re-derive candidates, record
//! metrics. Works identically for interactive oracles (a human behind
//! the actor shell) and simulated ones (ground truth plus a noise
//! model); only the oracle changes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use reid_core::{Confidence, Decision, EntityId, Feedback, Pair, Result, SimulationParams, UserId};
use reid_graph::EvidenceGraph;

use crate::engine::ReviewEngine;
use crate::oracle::DecisionOracle;

/// Reference partition of entities into true identities.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    label_of: HashMap<EntityId, usize>,
}

impl GroundTruth {
    /// Build from identity groups; entities absent from every group are
    /// treated as singletons (distinct from everything).
    pub fn from_groups<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = i64>,
    {
        let mut label_of = HashMap::new();
        for (label, group) in groups.into_iter().enumerate() {
            for id in group {
                label_of.insert(EntityId(id), label);
            }
        }
        Self { label_of }
    }

    /// True when both entities belong to the same true identity.
    pub fn same(&self, u: EntityId, v: EntityId) -> bool {
        match (self.label_of.get(&u), self.label_of.get(&v)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Number of entity pairs whose inferred clustering disagrees with
    /// the ground truth. Quadratic; simulation-only.
    pub fn residual_errors(&self, graph: &EvidenceGraph) -> usize {
        let ids: Vec<EntityId> = graph.entities().collect();
        let mut errors = 0;
        for (i, &u) in ids.iter().enumerate() {
            for &v in &ids[i + 1..] {
                let inferred_same = match (graph.name_of(u), graph.name_of(v)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                };
                if inferred_same != self.same(u, v) {
                    errors += 1;
                }
            }
        }
        errors
    }
}

/// Simulated reviewer: answers from ground truth, corrupted by a
/// per-class noise model with a seeded RNG so runs replay exactly.
pub struct NoisyOracle {
    truth: GroundTruth,
    accuracy_pos: f64,
    accuracy_neg: f64,
    rng: Mutex<StdRng>,
}

impl NoisyOracle {
    pub fn new(truth: GroundTruth, params: &SimulationParams) -> Self {
        Self {
            truth,
            accuracy_pos: params.accuracy_pos,
            accuracy_neg: params.accuracy_neg,
            rng: Mutex::new(StdRng::seed_from_u64(params.seed)),
        }
    }

    /// Perfect oracle (accuracy 1.0 on both classes).
    pub fn perfect(truth: GroundTruth) -> Self {
        Self::new(truth, &SimulationParams::default())
    }
}

#[async_trait]
impl DecisionOracle for NoisyOracle {
    async fn decide(&self, pair: Pair) -> Result<Option<Feedback>> {
        let (u, v) = pair.endpoints();
        let truly_same = self.truth.same(u, v);
        let (accuracy, correct, wrong) = if truly_same {
            (self.accuracy_pos, Decision::Positive, Decision::Negative)
        } else {
            (self.accuracy_neg, Decision::Negative, Decision::Positive)
        };
        let roll: f64 = {
            let mut rng = self.rng.lock().expect("oracle rng poisoned");
            rng.gen()
        };
        let decision = if roll < accuracy { correct } else { wrong };
        Ok(Some(
            Feedback::new(pair, decision, UserId::auto("sim"))
                .with_confidence(Confidence::PrettySure),
        ))
    }
}

/// Why a harness run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No candidates left anywhere: the natural end of a session.
    QueueExhausted,
    /// The refresh criterion signalled convergence.
    Converged,
    /// The configured step bound was reached.
    MaxSteps,
}

/// Metrics recorded after each applied decision.
#[derive(Debug, Clone, Serialize)]
pub struct StepMetrics {
    pub step: usize,
    pub edge: Pair,
    pub decision: Decision,
    pub manual_reviews: u64,
    pub auto_reviews: u64,
    /// Pairs still misclustered vs ground truth (simulation only).
    pub residual_errors: Option<usize>,
    pub inconsistent_clusters: usize,
    pub refresh_estimate: f64,
}

/// Outcome of a harness run.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub steps: Vec<StepMetrics>,
    pub termination: Termination,
}

impl HarnessReport {
    /// Residual errors after the final step (simulation only).
    pub fn final_errors(&self) -> Option<usize> {
        self.steps.last().and_then(|s| s.residual_errors)
    }
}

/// Owns one engine plus one decision oracle and drives the loop.
pub struct ReviewHarness<O: DecisionOracle> {
    engine: ReviewEngine,
    oracle: O,
    truth: Option<GroundTruth>,
    max_steps: usize,
}

impl<O: DecisionOracle> ReviewHarness<O> {
    pub fn new(engine: ReviewEngine, oracle: O) -> Self {
        Self {
            engine,
            oracle,
            truth: None,
            max_steps: reid_core::defaults::SIM_MAX_STEPS,
        }
    }

    /// Attach ground truth so residual errors are reported per step.
    pub fn with_ground_truth(mut self, truth: GroundTruth) -> Self {
        self.truth = Some(truth);
        self
    }

    /// Bound the number of review steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The driven engine (inspection after a run).
    pub fn engine(&self) -> &ReviewEngine {
        &self.engine
    }

    /// Run the review loop until the queue empties, the refresh
    /// criterion converges, or `max_steps` is hit.
    pub async fn run(&mut self) -> Result<HarnessReport> {
        let mut steps = Vec::new();
        let mut step = 0;
        self.engine.refresh_candidates().await?;

        let termination = loop {
            if step >= self.max_steps {
                break Termination::MaxSteps;
            }
            let candidate = match self.engine.pop_next() {
                Some(c) => c,
                None => {
                    // Queue drained: one re-derivation pass may surface
                    // pairs whose redundancy state changed.
                    if self.engine.refresh_candidates().await? == 0 {
                        break Termination::QueueExhausted;
                    }
                    match self.engine.pop_next() {
                        Some(c) => c,
                        None => break Termination::QueueExhausted,
                    }
                }
            };

            let feedback = match self.oracle.decide(candidate.edge).await {
                Ok(Some(fb)) => fb,
                Ok(None) => {
                    // Oracle had no decision; put the candidate back so
                    // it stays eligible for retry.
                    warn!(edge = %candidate.edge, "oracle returned no decision");
                    self.engine.requeue(&candidate);
                    step += 1;
                    continue;
                }
                Err(e) => {
                    // Oracle failures never crash the session.
                    warn!(edge = %candidate.edge, error = %e, "oracle failed");
                    self.engine.requeue(&candidate);
                    step += 1;
                    continue;
                }
            };

            self.engine.apply_feedback(feedback.clone())?;
            step += 1;

            let status = self.engine.status();
            steps.push(StepMetrics {
                step,
                edge: candidate.edge,
                decision: feedback.evidence_decision,
                manual_reviews: status.manual_reviews,
                auto_reviews: status.auto_reviews,
                residual_errors: self
                    .truth
                    .as_ref()
                    .map(|t| t.residual_errors(self.engine.graph())),
                inconsistent_clusters: status.num_inconsistent,
                refresh_estimate: status.refresh_estimate,
            });

            if self.engine.converged() {
                break Termination::Converged;
            }
        };

        info!(
            step,
            termination = ?termination,
            "review loop finished"
        );
        Ok(HarnessReport { steps, termination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::AllPairs;
    use crate::oracle::MockScoreOracle;
    use reid_core::{EngineParams, ReviewLog};

    fn engine_for(ids: &[i64]) -> ReviewEngine {
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

    #[test]
    fn ground_truth_same_and_errors() {
        let truth = GroundTruth::from_groups(vec![vec![1, 2], vec![3]]);
        assert!(truth.same(EntityId(1), EntityId(2)));
        assert!(!truth.same(EntityId(1), EntityId(3)));
        // Entities unknown to the truth are singletons.
        assert!(!truth.same(EntityId(1), EntityId(9)));
    }

    #[tokio::test]
    async fn perfect_oracle_terminates_and_recovers_truth() {
        let truth = GroundTruth::from_groups(vec![vec![10, 11], vec![12, 13]]);
        let harness_truth = truth.clone();
        let engine = engine_for(&[10, 11, 12, 13]);
        let oracle = NoisyOracle::perfect(truth);
        let mut harness = ReviewHarness::new(engine, oracle)
            .with_ground_truth(harness_truth)
            .with_max_steps(100);
        let report = harness.run().await.unwrap();

        // Bounded by the number of distinct pairs.
        assert!(report.steps.len() <= 6);
        assert_ne!(report.termination, Termination::MaxSteps);
        assert_eq!(report.final_errors(), Some(0));

        let clusters: Vec<Vec<i64>> = harness
            .engine()
            .graph()
            .connected_components()
            .map(|c| c.iter().map(|e| e.0).collect())
            .collect();
        assert!(clusters.contains(&vec![10, 11]));
        assert!(clusters.contains(&vec![12, 13]));
        assert_eq!(
            harness.engine().graph().inconsistent_clusters().len(),
            0
        );
    }

    #[tokio::test]
    async fn default_redundancy_session_terminates() {
        // Three distinct individuals: redun.neg = 2 is unreachable
        // between singleton clusters, which must not keep decided
        // pairs in review. The loop is bounded by the number of
        // distinct pairs.
        let truth = GroundTruth::from_groups(vec![vec![1], vec![2], vec![3]]);
        let mut engine = ReviewEngine::new(
            EngineParams::default(),
            Box::new(MockScoreOracle::new()),
            Box::new(AllPairs),
            ReviewLog::in_memory(),
        );
        engine
            .start(&[EntityId(1), EntityId(2), EntityId(3)])
            .unwrap();
        let oracle = NoisyOracle::perfect(truth.clone());
        let mut harness = ReviewHarness::new(engine, oracle)
            .with_ground_truth(truth)
            .with_max_steps(50);
        let report = harness.run().await.unwrap();

        assert_eq!(report.termination, Termination::QueueExhausted);
        assert!(report.steps.len() <= 3);
        assert_eq!(report.final_errors(), Some(0));
    }

    #[tokio::test]
    async fn noisy_oracle_is_deterministic_per_seed() {
        let groups = vec![vec![1, 2, 3], vec![4, 5]];
        let params = SimulationParams {
            accuracy_pos: 0.8,
            accuracy_neg: 0.8,
            seed: 7,
            ..Default::default()
        };

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let truth = GroundTruth::from_groups(groups.clone());
            let oracle = NoisyOracle::new(truth, &params);
            let mut decisions = Vec::new();
            for (u, v) in [(1, 2), (1, 4), (2, 3), (4, 5)] {
                let fb = oracle.decide(Pair::new(u, v)).await.unwrap().unwrap();
                decisions.push(fb.evidence_decision);
            }
            outcomes.push(decisions);
        }
        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[tokio::test]
    async fn max_steps_bounds_the_loop() {
        struct Contrarian;
        #[async_trait]
        impl DecisionOracle for Contrarian {
            async fn decide(&self, pair: Pair) -> Result<Option<Feedback>> {
                Ok(Some(Feedback::new(
                    pair,
                    Decision::Positive,
                    UserId::auto("contrarian"),
                )))
            }
        }
        let engine = engine_for(&[1, 2, 3, 4, 5, 6]);
        let mut harness = ReviewHarness::new(engine, Contrarian).with_max_steps(3);
        let report = harness.run().await.unwrap();
        assert!(report.steps.len() <= 3);
    }

    #[tokio::test]
    async fn failing_oracle_does_not_crash_session() {
        struct Flaky {
            calls: Mutex<u32>,
        }
        #[async_trait]
        impl DecisionOracle for Flaky {
            async fn decide(&self, pair: Pair) -> Result<Option<Feedback>> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    return Ok(None);
                }
                Ok(Some(Feedback::new(
                    pair,
                    Decision::Negative,
                    UserId::auto("flaky"),
                )))
            }
        }
        let engine = engine_for(&[1, 2]);
        let oracle = Flaky {
            calls: Mutex::new(0),
        };
        let mut harness = ReviewHarness::new(engine, oracle).with_max_steps(10);
        let report = harness.run().await.unwrap();
        // The first candidate was skipped, then decided on retry.
        assert!(!report.steps.is_empty());
        assert_eq!(report.steps[0].decision, Decision::Negative);
    }
}
