//! Per-pair review records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reid_core::{Confidence, Decision, Feedback, Pair, UserId};

/// All evidence for one unordered entity pair.
///
/// At most one decision is authoritative at a time; prior feedbacks are
/// retained in `history` for audit. Records are created lazily when a
/// pair first receives evidence and never physically deleted — a
/// corrected pair is demoted to [`Decision::Unreviewed`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// The normalized pair this record covers.
    pub pair: Pair,
    /// Current authoritative decision.
    pub decision: Decision,
    /// Free-text annotations from the latest feedback.
    pub tags: Vec<String>,
    /// Confidence of the latest feedback.
    pub confidence: Confidence,
    /// Who produced the latest decision.
    pub user_id: Option<UserId>,
    /// When the latest decision was committed.
    pub timestamp: Option<DateTime<Utc>>,
    /// Manual priority override; sorts above classifier scores when set.
    pub priority_override: Option<f64>,
    /// Prior feedbacks, oldest first (audit trail).
    pub history: Vec<Feedback>,
}

impl EdgeRecord {
    /// Fresh unreviewed record for a pair.
    pub fn new(pair: Pair) -> Self {
        Self {
            pair,
            decision: Decision::Unreviewed,
            tags: Vec::new(),
            confidence: Confidence::Unspecified,
            user_id: None,
            timestamp: None,
            priority_override: None,
            history: Vec::new(),
        }
    }

    /// Apply a feedback, pushing the previous authoritative state into
    /// history. Returns the decision that was replaced.
    pub fn apply(&mut self, feedback: &Feedback) -> Decision {
        let previous = self.decision;
        self.decision = feedback.evidence_decision;
        self.tags = feedback.tags.clone();
        self.confidence = feedback.confidence;
        self.user_id = Some(feedback.user_id.clone());
        self.timestamp = Some(feedback.timestamp);
        self.history.push(feedback.clone());
        previous
    }

    /// Demote to unreviewed (correction path). History is preserved.
    pub fn demote(&mut self) -> Decision {
        let previous = self.decision;
        self.decision = Decision::Unreviewed;
        self.user_id = None;
        self.timestamp = None;
        previous
    }

    /// True once any reviewed decision is on record.
    pub fn is_reviewed(&self) -> bool {
        self.decision.is_reviewed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_tracks_history() {
        let pair = Pair::new(1, 2);
        let mut rec = EdgeRecord::new(pair);
        assert!(!rec.is_reviewed());

        let fb = Feedback::new(pair, Decision::Positive, "user:a");
        let prev = rec.apply(&fb);
        assert_eq!(prev, Decision::Unreviewed);
        assert_eq!(rec.decision, Decision::Positive);
        assert_eq!(rec.history.len(), 1);

        let fb2 = Feedback::new(pair, Decision::Negative, "user:b");
        let prev = rec.apply(&fb2);
        assert_eq!(prev, Decision::Positive);
        assert_eq!(rec.decision, Decision::Negative);
        assert_eq!(rec.history.len(), 2);
    }

    #[test]
    fn demote_keeps_history() {
        let pair = Pair::new(1, 2);
        let mut rec = EdgeRecord::new(pair);
        rec.apply(&Feedback::new(pair, Decision::Positive, "user:a"));
        let prev = rec.demote();
        assert_eq!(prev, Decision::Positive);
        assert_eq!(rec.decision, Decision::Unreviewed);
        assert_eq!(rec.history.len(), 1);
    }
}
