//! Convergence (refresh) criterion.
//!
//! Maintains a running estimate of the probability that another review
//! would still change the clustering: an exponentially weighted moving
//! average of the meaningful-decision indicator over a configured
//! window. When the estimate stays below the threshold for `patience`
//! consecutive observations the criterion signals convergence. The
//! signal is advisory: the harness consults it, the engine does not
//! enforce it.

use serde::Serialize;
use tracing::debug;

use reid_core::RefreshParams;

/// Windowed positive-rate estimator over decision outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshCriterion {
    #[serde(skip)]
    params: RefreshParams,
    estimate: f64,
    below_streak: u32,
    observations: u64,
}

impl RefreshCriterion {
    /// Start pessimistic: with no observations the estimate is 1.0, so
    /// a fresh session never reports convergence.
    pub fn new(params: RefreshParams) -> Self {
        Self {
            params,
            estimate: 1.0,
            below_streak: 0,
            observations: 0,
        }
    }

    /// Record one decision outcome. `meaningful` is true when the
    /// decision changed the clustering or the inconsistency set.
    pub fn observe(&mut self, meaningful: bool) {
        let alpha = 2.0 / (self.params.window as f64 + 1.0);
        let x = if meaningful { 1.0 } else { 0.0 };
        self.estimate = alpha * x + (1.0 - alpha) * self.estimate;
        self.observations += 1;
        if self.estimate < self.params.threshold {
            self.below_streak = self.below_streak.saturating_add(1);
        } else {
            self.below_streak = 0;
        }
        debug!(
            refresh_estimate = self.estimate,
            below_streak = self.below_streak,
            "observed decision outcome"
        );
    }

    /// Current estimate of the probability that an undiscovered
    /// merge/split remains.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Decisions observed so far.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Advisory convergence signal.
    pub fn converged(&self) -> bool {
        self.below_streak >= self.params.patience
    }

    /// Reset to the pessimistic initial state (new candidate batch).
    pub fn reset(&mut self) {
        self.estimate = 1.0;
        self.below_streak = 0;
    }
}

impl Default for RefreshCriterion {
    fn default() -> Self {
        Self::new(RefreshParams::default())
    }
}
