//! # reid-engine
//!
//! The decision engine that drives incremental identity inference:
//! candidate generation, the review priority queue, the convergence
//! (refresh) estimator, and the review/simulation harness.
//!
//! The engine is logically single-threaded: all graph mutations are
//! serialized through [`ReviewEngine::apply_feedback`]. Concurrency
//! lives one layer up, in the actor mailbox (`reid-actor`), which
//! drains commands in arrival order.

pub mod candidates;
pub mod engine;
pub mod harness;
pub mod oracle;
pub mod queue;
pub mod refresh;

pub use candidates::{AllPairs, CandidateSource};
pub use engine::{Candidate, EngineStatus, ReviewEngine};
pub use harness::{
    GroundTruth, HarnessReport, NoisyOracle, ReviewHarness, StepMetrics, Termination,
};
pub use oracle::{DecisionOracle, MockScoreOracle, PairProbs, ScoreOracle};
pub use queue::PriorityQueue;
pub use refresh::RefreshCriterion;
