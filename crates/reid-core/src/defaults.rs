//! Centralized default constants for the reid engine.
//!
//! **This module is the single source of truth** for shared default
//! values. All crates reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// REDUNDANCY
// =============================================================================

/// Positive redundancy target: internal confirming edges required before
/// a cluster is considered settled (`redun.pos`).
pub const REDUN_POS: u32 = 2;

/// Negative redundancy target: cross NEGATIVE edges required before a
/// cluster pair is considered settled (`redun.neg`).
pub const REDUN_NEG: u32 = 2;

// =============================================================================
// REVIEW QUEUE
// =============================================================================

/// Maximum candidates surfaced to a reviewer per request
/// (`manual.n_peek`).
pub const MANUAL_N_PEEK: usize = 50;

/// Priority assigned to manually requested re-reviews; sorts above any
/// classifier probability.
pub const PRIORITY_MANUAL_OVERRIDE: f64 = 2.0;

// =============================================================================
// REFRESH / CONVERGENCE
// =============================================================================

/// Window (in decisions) of the exponential moving estimate of the
/// meaningful-decision rate.
pub const REFRESH_WINDOW: usize = 20;

/// Convergence threshold: the session is advisory-converged when the
/// meaningful-decision rate estimate stays below this value.
pub const REFRESH_THRESHOLD: f64 = 0.052;

/// Consecutive below-threshold updates required before signalling
/// convergence.
pub const REFRESH_PATIENCE: u32 = 3;

// =============================================================================
// SIMULATION
// =============================================================================

/// Default step bound for simulated review sessions.
pub const SIM_MAX_STEPS: usize = 10_000;

/// Default oracle accuracy for positive ground-truth pairs.
pub const SIM_ACCURACY_POS: f64 = 1.0;

/// Default oracle accuracy for negative ground-truth pairs.
pub const SIM_ACCURACY_NEG: f64 = 1.0;
