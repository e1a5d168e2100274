//! Feedback payloads and review records.
//!
//! A [`Feedback`] is one piece of evidence for a pair as submitted by a
//! reviewer or classifier. A [`ReviewRecord`] is the persisted form: a
//! feedback plus a time-ordered record id, which is what the append-only
//! review log stores and replays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::{Confidence, Decision, UserId};
use crate::types::Pair;

/// Derived per-pair state exposed to callers that want "is this safe to
/// treat as ground truth".
///
/// `Inconsistent` is not a stored edge value: it is derived from the
/// surrounding cluster state (internal negative edge, or contradictory
/// cross-cluster evidence) and overrides the raw decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Unreviewed,
    Positive,
    Negative,
    Incomparable,
    Inconsistent,
}

/// One piece of evidence for an entity pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// The reviewed pair.
    pub edge: Pair,
    /// The evidence decision being asserted.
    pub evidence_decision: Decision,
    /// Secondary bookkeeping decision (never affects clustering).
    #[serde(default)]
    pub meta_decision: Decision,
    /// Free-text annotations, e.g. "photobomb".
    #[serde(default)]
    pub tags: Vec<String>,
    /// Who or what produced the decision.
    pub user_id: UserId,
    /// Reviewer confidence.
    #[serde(default)]
    pub confidence: Confidence,
    /// When the decision was committed.
    pub timestamp: DateTime<Utc>,
    /// Review-start provenance marker, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_s1: Option<i64>,
    /// First-click provenance marker, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_c1: Option<i64>,
    /// Commit-click provenance marker, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_c2: Option<i64>,
}

impl Feedback {
    /// Minimal feedback with the current time and no tags.
    pub fn new(edge: Pair, decision: Decision, user_id: impl Into<UserId>) -> Self {
        Feedback {
            edge,
            evidence_decision: decision,
            meta_decision: Decision::Unreviewed,
            tags: Vec::new(),
            user_id: user_id.into(),
            confidence: Confidence::Unspecified,
            timestamp: Utc::now(),
            timestamp_s1: None,
            timestamp_c1: None,
            timestamp_c2: None,
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach a confidence ordinal.
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Override the commit timestamp (used by replay and tests).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A persisted feedback: what the append-only review log stores.
///
/// The record id is a UUIDv7, so (timestamp, id) gives a total
/// replay order that is stable across loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Time-ordered record id.
    pub id: Uuid,
    #[serde(flatten)]
    pub feedback: Feedback,
}

impl ReviewRecord {
    /// Wrap a feedback in a fresh record.
    pub fn new(feedback: Feedback) -> Self {
        ReviewRecord {
            id: Uuid::now_v7(),
            feedback,
        }
    }

    /// Total-order replay key: timestamp first, record id as tiebreak.
    pub fn replay_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.feedback.timestamp, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_json_round_trip() {
        let fb = Feedback::new(Pair::new(2, 1), Decision::Positive, UserId::user("alice"))
            .with_tags(vec!["photobomb".to_string()])
            .with_confidence(Confidence::PrettySure);
        let json = serde_json::to_string(&fb).unwrap();
        let back: Feedback = serde_json::from_str(&json).unwrap();
        assert_eq!(fb, back);
    }

    #[test]
    fn feedback_accepts_legacy_payload() {
        let json = serde_json::json!({
            "edge": [1, 2],
            "evidence_decision": "match",
            "meta_decision": "unreviewed",
            "tags": [],
            "user_id": "user:doctest",
            "confidence": "pretty_sure",
            "timestamp": "2026-01-05T00:00:00Z",
            "timestamp_s1": 1,
            "timestamp_c1": 2,
            "timestamp_c2": 3,
        });
        let fb: Feedback = serde_json::from_value(json).unwrap();
        assert_eq!(fb.evidence_decision, Decision::Positive);
        assert_eq!(fb.confidence, Confidence::PrettySure);
        assert_eq!(fb.timestamp_c2, Some(3));
    }

    #[test]
    fn record_replay_key_orders_by_timestamp() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);
        let a = ReviewRecord::new(
            Feedback::new(Pair::new(1, 2), Decision::Positive, "user:a").with_timestamp(t1),
        );
        let b = ReviewRecord::new(
            Feedback::new(Pair::new(3, 4), Decision::Negative, "user:b").with_timestamp(t0),
        );
        assert!(b.replay_key() < a.replay_key());
    }
}
