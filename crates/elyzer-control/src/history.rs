// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Comparison History
// © 1998–2026 Miroslav Šotek. All rights reserved.
// ─────────────────────────────────────────────────────────────────────
//! Bounded rolling history of comparison snapshots.
//! Oldest entries are evicted first; only the harness writes to it.

use elyzer_types::state::ComparisonSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Default number of retained snapshots.
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonHistory {
    entries: VecDeque<ComparisonSnapshot>,
    capacity: usize,
}

impl ComparisonHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: ComparisonSnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ComparisonSnapshot> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ComparisonSnapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How often each controller was the best performer.
    pub fn win_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for name in self.entries.iter().filter_map(|s| s.best_performer.as_ref()) {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ComparisonHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
