//! Structured logging field names for the reid engine.
//!
//! The field names emitted across the reid crates follow this catalog
//! so log aggregation tools can query by standardized names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Command aborted, requires caller attention |
//! | WARN  | Recoverable issue (oracle failure, skipped candidate) |
//! | INFO  | Session lifecycle (start, converged), merges and splits |
//! | DEBUG | Decision application, priority recomputation, counters |
//! | TRACE | Per-pair iteration (candidate scoring, queue pops) |

/// Subsystem originating the log event.
/// Values: "graph", "engine", "actor"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "cluster_index", "queue", "refresh", "harness", "mailbox"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "apply_feedback", "merge", "split", "pop_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entity (annotation) id being operated on.
pub const ENTITY_ID: &str = "entity_id";

/// Edge being reviewed, rendered as "(lo, hi)".
pub const EDGE: &str = "edge";

/// Name label of a cluster.
pub const NAME_ID: &str = "name_id";

/// Decision value applied to an edge.
pub const DECISION: &str = "decision";

/// Reviewer/classifier identity for a decision.
pub const USER_ID: &str = "user_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of clusters after an operation.
pub const CLUSTER_COUNT: &str = "cluster_count";

/// Number of candidates produced or queued.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of inconsistent clusters currently flagged.
pub const INCONSISTENT_COUNT: &str = "inconsistent_count";

/// Current convergence estimate from the refresh criterion.
pub const REFRESH_ESTIMATE: &str = "refresh_estimate";

/// Review step index within a harness run.
pub const STEP: &str = "step";
