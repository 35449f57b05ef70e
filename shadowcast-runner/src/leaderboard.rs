//! Per-target leaderboard — bounded, deduplicated, sorted by backtest.
//!
//! Each target keeps its own leaderboard of the best strategies. Deduplication
//! key: the strategy fingerprint. If a strategy with the same fingerprint
//! arrives with a better backtest it replaces the existing entry; otherwise it
//! is skipped.
//!
//! Ordering everywhere is the single selection rule: accuracy descending, then
//! scored years descending, then label ascending. Non-finite accuracy never
//! enters a leaderboard.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use shadowcast_core::candidate::Fingerprint;
use shadowcast_core::domain::TargetId;

use crate::backtest::BacktestResult;
use crate::strategy::Strategy;

/// A single entry in the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub label: String,
    pub target: TargetId,
    pub strategy: Strategy,
    pub hash: Fingerprint,
    pub backtest: BacktestResult,
}

impl LeaderboardEntry {
    pub fn new(target: TargetId, strategy: Strategy, backtest: BacktestResult) -> Self {
        Self {
            label: strategy.label(&target),
            hash: Fingerprint::of(&(&target, &strategy)),
            target,
            strategy,
            backtest,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.strategy.kind()
    }
}

/// Outcome of an insert operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// New entry added to the leaderboard.
    Inserted,
    /// Replaced an existing entry with the same fingerprint (better backtest).
    Replaced,
    /// Skipped: duplicate with worse or equal backtest, or NaN accuracy.
    Skipped,
}

/// Total order used for selection; `Less` means `a` ranks first.
pub fn selection_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.backtest
        .accuracy
        .partial_cmp(&a.backtest.accuracy)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.backtest.n.cmp(&a.backtest.n))
        .then_with(|| a.label.cmp(&b.label))
}

/// Per-target leaderboard: top N strategies ranked by backtest.
#[derive(Debug, Clone)]
pub struct TargetLeaderboard {
    target: TargetId,
    entries: Vec<LeaderboardEntry>,
    max_size: usize,
}

impl TargetLeaderboard {
    pub fn new(target: TargetId, max_size: usize) -> Self {
        Self {
            target,
            entries: Vec::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Insert an entry. Returns the outcome.
    ///
    /// - Rejects entries whose accuracy is not finite.
    /// - Deduplicates by fingerprint: replaces if better, skips otherwise.
    /// - After insert, trims to `max_size` by dropping the last-ranked entry.
    pub fn insert(&mut self, entry: LeaderboardEntry) -> InsertResult {
        if !entry.backtest.is_viable() {
            return InsertResult::Skipped;
        }

        if let Some(idx) = self.entries.iter().position(|e| e.hash == entry.hash) {
            if selection_order(&entry, &self.entries[idx]) == Ordering::Less {
                self.entries[idx] = entry;
                self.sort_entries();
                return InsertResult::Replaced;
            }
            return InsertResult::Skipped;
        }

        if self.entries.len() < self.max_size {
            self.entries.push(entry);
            self.sort_entries();
            InsertResult::Inserted
        } else if let Some(worst) = self.entries.last() {
            if selection_order(&entry, worst) == Ordering::Less {
                self.entries.pop();
                self.entries.push(entry);
                self.sort_entries();
                InsertResult::Inserted
            } else {
                InsertResult::Skipped
            }
        } else {
            // max_size 0
            InsertResult::Skipped
        }
    }

    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by(selection_order);
    }
}

/// Best entry across several leaderboards under the same selection rule.
pub fn best_overall<'a>(
    boards: impl IntoIterator<Item = &'a TargetLeaderboard>,
) -> Option<&'a LeaderboardEntry> {
    boards
        .into_iter()
        .filter_map(TargetLeaderboard::best)
        .min_by(|a, b| selection_order(a, b))
}

// ─── Tests ───────────────────────────────────────────────────────────
