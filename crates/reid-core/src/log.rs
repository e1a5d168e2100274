//! Append-only review log.
//!
//! Decisions persist as JSONL review records keyed by (pair, timestamp).
//! The engine reconstructs full graph state by replaying the log in
//! timestamp order; replay is deterministic (total order via
//! [`ReviewRecord::replay_key`]) and idempotent (re-applying a record
//! upserts the same authoritative decision).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::feedback::{Feedback, ReviewRecord};

/// In-memory review log with optional JSONL file persistence.
#[derive(Debug, Default)]
pub struct ReviewLog {
    records: Vec<ReviewRecord>,
    path: Option<PathBuf>,
}

impl ReviewLog {
    /// In-memory log with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) a JSONL-backed log at `path`, loading any
    /// existing records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();
        if path.exists() {
            let file = File::open(&path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: ReviewRecord = serde_json::from_str(&line)?;
                records.push(record);
            }
            info!(
                path = %path.display(),
                record_count = records.len(),
                "loaded review log"
            );
        }
        Ok(Self {
            records,
            path: Some(path),
        })
    }

    /// Append a feedback as a new record; persists immediately when
    /// file-backed.
    pub fn append(&mut self, feedback: Feedback) -> Result<()> {
        let record = ReviewRecord::new(feedback);
        if let Some(path) = &self.path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{line}")?;
        }
        debug!(edge = %record.feedback.edge, "appended review record");
        self.records.push(record);
        Ok(())
    }

    /// All records in arrival order.
    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    /// Records sorted by replay key (timestamp, record id): the order
    /// `reset_feedback`-style replay must apply them in.
    pub fn replay_order(&self) -> Vec<&ReviewRecord> {
        let mut out: Vec<&ReviewRecord> = self.records.iter().collect();
        out.sort_by_key(|r| r.replay_key());
        out
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been logged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::types::Pair;
    use chrono::{Duration, Utc};

    #[test]
    fn append_and_replay_order() {
        let t0 = Utc::now();
        let mut log = ReviewLog::in_memory();
        // Logged out of timestamp order.
        log.append(
            Feedback::new(Pair::new(1, 2), Decision::Positive, "user:a")
                .with_timestamp(t0 + Duration::seconds(2)),
        )
        .unwrap();
        log.append(
            Feedback::new(Pair::new(3, 4), Decision::Negative, "user:a").with_timestamp(t0),
        )
        .unwrap();

        let order = log.replay_order();
        assert_eq!(order[0].feedback.edge, Pair::new(3, 4));
        assert_eq!(order[1].feedback.edge, Pair::new(1, 2));
    }

    #[test]
    fn file_backed_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.jsonl");
        {
            let mut log = ReviewLog::open(&path).unwrap();
            log.append(Feedback::new(Pair::new(1, 2), Decision::Positive, "user:a"))
                .unwrap();
            log.append(Feedback::new(Pair::new(2, 3), Decision::Negative, "user:b"))
                .unwrap();
        }
        let log = ReviewLog::open(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].feedback.edge, Pair::new(1, 2));
        assert_eq!(log.records()[1].feedback.user_id.0, "user:b");
    }

    #[test]
    fn empty_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.jsonl");
        std::fs::write(&path, "\n").unwrap();
        let log = ReviewLog::open(&path).unwrap();
        assert!(log.is_empty());
    }
}
