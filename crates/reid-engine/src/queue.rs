//! Review priority queue.
//!
//! A max-heap of `(priority, insertion sequence)` entries with lazy
//! invalidation: suppressing or re-prioritizing a pair leaves stale
//! heap entries behind and they are discarded at pop time against the
//! live map. Ties break by insertion order (oldest candidate first) so
//! replays are deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use reid_core::Pair;

#[derive(Debug, Clone, Copy)]
struct Entry {
    priority: f64,
    seq: u64,
    pair: Pair,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: highest priority first, then oldest insertion.
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue over candidate pairs with soft deletion.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<Entry>,
    live: HashMap<Pair, (f64, u64)>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live candidates.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// True when no live candidates remain.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Insert or re-prioritize a candidate. Re-pushing with an
    /// unchanged priority keeps the original insertion sequence, so a
    /// suppressed-then-requeued pair does not jump the tie-break line.
    pub fn push(&mut self, pair: Pair, priority: f64) {
        if let Some(&(p, _)) = self.live.get(&pair) {
            if p == priority {
                return;
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(pair, (priority, seq));
        self.heap.push(Entry {
            priority,
            seq,
            pair,
        });
    }

    /// Soft-delete a candidate; stale heap entries are skipped later.
    pub fn suppress(&mut self, pair: &Pair) {
        self.live.remove(pair);
    }

    /// Current priority of a live candidate.
    pub fn priority_of(&self, pair: &Pair) -> Option<f64> {
        self.live.get(pair).map(|&(p, _)| p)
    }

    /// Pop the highest-priority live candidate. `None` means the queue
    /// is exhausted — the session-level termination condition, not an
    /// error.
    pub fn pop_next(&mut self) -> Option<(Pair, f64)> {
        while let Some(entry) = self.heap.pop() {
            match self.live.get(&entry.pair) {
                Some(&(p, seq)) if p == entry.priority && seq == entry.seq => {
                    self.live.remove(&entry.pair);
                    return Some((entry.pair, entry.priority));
                }
                _ => continue, // stale
            }
        }
        None
    }

    /// The top `n` live candidates in pop order, without consuming
    /// them.
    pub fn peek_n(&self, n: usize) -> Vec<(Pair, f64)> {
        let mut entries: Vec<(&Pair, &(f64, u64))> = self.live.iter().collect();
        entries.sort_by(|a, b| {
            b.1 .0
                .total_cmp(&a.1 .0)
                .then_with(|| a.1 .1.cmp(&b.1 .1))
        });
        entries
            .into_iter()
            .take(n)
            .map(|(pair, &(p, _))| (*pair, p))
            .collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}
