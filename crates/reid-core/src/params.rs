//! Engine parameter structs.
//!
//! Explicit, serde-deserializable configuration owned by the session:
//! the `start` command may carry a JSON `config` object that overrides
//! any subset of these fields.

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Redundancy thresholds (`redun.pos` / `redun.neg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedundancyParams {
    /// Internal confirming edges required before a cluster stops being
    /// queued for more review.
    pub pos: u32,
    /// Cross NEGATIVE edges required before a cluster pair stops being
    /// queued.
    pub neg: u32,
}

impl Default for RedundancyParams {
    fn default() -> Self {
        Self {
            pos: defaults::REDUN_POS,
            neg: defaults::REDUN_NEG,
        }
    }
}

/// Convergence estimator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshParams {
    /// Window (in decisions) for the exponential moving rate estimate.
    pub window: usize,
    /// Estimate below which the session is considered converged.
    pub threshold: f64,
    /// Consecutive below-threshold updates required.
    pub patience: u32,
}

impl Default for RefreshParams {
    fn default() -> Self {
        Self {
            window: defaults::REFRESH_WINDOW,
            threshold: defaults::REFRESH_THRESHOLD,
            patience: defaults::REFRESH_PATIENCE,
        }
    }
}

/// Simulation harness parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Hard bound on review steps.
    pub max_steps: usize,
    /// Oracle accuracy on ground-truth-positive pairs.
    pub accuracy_pos: f64,
    /// Oracle accuracy on ground-truth-negative pairs.
    pub accuracy_neg: f64,
    /// RNG seed for the noise model.
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_steps: defaults::SIM_MAX_STEPS,
            accuracy_pos: defaults::SIM_ACCURACY_POS,
            accuracy_neg: defaults::SIM_ACCURACY_NEG,
            seed: 0,
        }
    }
}

/// Top-level engine parameters for one identity-inference session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Redundancy thresholds.
    pub redun: RedundancyParams,
    /// Convergence estimator.
    pub refresh: RefreshParams,
    /// Candidates surfaced per reviewer request (`manual.n_peek`).
    pub manual_n_peek: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            redun: RedundancyParams::default(),
            refresh: RefreshParams::default(),
            manual_n_peek: defaults::MANUAL_N_PEEK,
        }
    }
}

impl EngineParams {
    /// Override the redundancy thresholds.
    pub fn with_redun(mut self, pos: u32, neg: u32) -> Self {
        self.redun = RedundancyParams { pos, neg };
        self
    }

    /// Override the convergence estimator parameters.
    pub fn with_refresh(mut self, refresh: RefreshParams) -> Self {
        self.refresh = refresh;
        self
    }

    /// Override the per-request candidate count.
    pub fn with_n_peek(mut self, n: usize) -> Self {
        self.manual_n_peek = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let p = EngineParams::default();
        assert_eq!(p.redun.pos, defaults::REDUN_POS);
        assert_eq!(p.redun.neg, defaults::REDUN_NEG);
        assert_eq!(p.manual_n_peek, defaults::MANUAL_N_PEEK);
    }

    #[test]
    fn partial_config_json_overrides() {
        let p: EngineParams =
            serde_json::from_value(serde_json::json!({"redun": {"pos": 3}})).unwrap();
        assert_eq!(p.redun.pos, 3);
        assert_eq!(p.redun.neg, defaults::REDUN_NEG);
        assert_eq!(p.refresh.patience, defaults::REFRESH_PATIENCE);
    }

    #[test]
    fn builder_overrides() {
        let p = EngineParams::default().with_redun(1, 1).with_n_peek(5);
        assert_eq!(p.redun.pos, 1);
        assert_eq!(p.manual_n_peek, 5);
    }
}
