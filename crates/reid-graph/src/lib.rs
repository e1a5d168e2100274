//! # reid-graph
//!
//! The entity/evidence graph at the heart of the reid engine: an
//! undirected multigraph over annotation ids where each logical edge
//! carries the authoritative review decision for one pair, and the
//! connected components of the positive subgraph are the inferred
//! identity clusters.
//!
//! Cluster membership, redundancy counters, and inconsistency flags are
//! maintained incrementally: merges cost O(edges touching the smaller
//! cluster), and only splits (rare) rescan the affected component.

pub mod cluster;
pub mod edge;
pub mod graph;
pub mod union_find;

pub use cluster::{ClusterStats, CrossStats};
pub use edge::EdgeRecord;
pub use graph::{EdgeDelta, EvidenceGraph};
pub use union_find::UnionFind;
