//! Oracle seams: the external probability classifier and the decision
//! source (human reviewer, remote client, or simulated ground truth).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reid_core::{Feedback, Pair, Result};

/// Probability vector returned by the pairwise classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairProbs {
    pub p_positive: f64,
    pub p_negative: f64,
    pub p_incomparable: f64,
}

impl PairProbs {
    /// Uniform prior used when no classifier is available.
    pub fn uniform() -> Self {
        Self {
            p_positive: 1.0 / 3.0,
            p_negative: 1.0 / 3.0,
            p_incomparable: 1.0 / 3.0,
        }
    }

    /// Queue priority contribution: the positive-class score, so likely
    /// merges surface first.
    pub fn priority(&self) -> f64 {
        self.p_positive
    }
}

/// External pairwise probability oracle. Pure function of the current
/// feature state; the engine caches results per pair.
#[async_trait]
pub trait ScoreOracle: Send + Sync {
    /// Score one pair.
    async fn probs(&self, pair: Pair) -> Result<PairProbs>;

    /// Classifier name, used for `auto:<name>` attribution.
    fn name(&self) -> &str {
        "classifier"
    }
}

/// External decision source for a candidate pair.
///
/// Returning `Ok(None)` means "no decision available" (reviewer
/// disconnected, classifier declined): the candidate stays queued and
/// the session keeps going.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, pair: Pair) -> Result<Option<Feedback>>;
}

/// Deterministic mock score oracle for tests.
///
/// Scores come from a fixed per-pair table with a configurable default;
/// every call is logged for assertion.
pub struct MockScoreOracle {
    fixed: HashMap<Pair, PairProbs>,
    default: PairProbs,
    calls: Mutex<Vec<Pair>>,
}

impl MockScoreOracle {
    pub fn new() -> Self {
        Self {
            fixed: HashMap::new(),
            default: PairProbs::uniform(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the fallback probability vector.
    pub fn with_default(mut self, probs: PairProbs) -> Self {
        self.default = probs;
        self
    }

    /// Pin the score for one pair.
    pub fn with_pair(mut self, pair: Pair, probs: PairProbs) -> Self {
        self.fixed.insert(pair, probs);
        self
    }

    /// Pairs scored so far, in call order.
    pub fn calls(&self) -> Vec<Pair> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

impl Default for MockScoreOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreOracle for MockScoreOracle {
    async fn probs(&self, pair: Pair) -> Result<PairProbs> {
        self.calls.lock().expect("mock call log poisoned").push(pair);
        Ok(self.fixed.get(&pair).copied().unwrap_or(self.default))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_fixed_then_default() {
        let oracle = MockScoreOracle::new()
            .with_default(PairProbs {
                p_positive: 0.1,
                p_negative: 0.8,
                p_incomparable: 0.1,
            })
            .with_pair(
                Pair::new(1, 2),
                PairProbs {
                    p_positive: 0.9,
                    p_negative: 0.05,
                    p_incomparable: 0.05,
                },
            );
        let hit = oracle.probs(Pair::new(2, 1)).await.unwrap();
        assert!((hit.p_positive - 0.9).abs() < 1e-9);
        let miss = oracle.probs(Pair::new(3, 4)).await.unwrap();
        assert!((miss.p_negative - 0.8).abs() < 1e-9);
        assert_eq!(oracle.calls(), vec![Pair::new(1, 2), Pair::new(3, 4)]);
    }

    #[test]
    fn priority_is_positive_score() {
        let p = PairProbs {
            p_positive: 0.7,
            p_negative: 0.2,
            p_incomparable: 0.1,
        };
        assert!((p.priority() - 0.7).abs() < 1e-9);
    }
}
