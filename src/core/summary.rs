//! Per-run outcome counters

use crate::core::engine::{MatchOutcome, Resolution};
use std::fmt;

/// Tally of alert outcomes over one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Matched by a tier that returned exactly one candidate
    pub matched: usize,
    /// Matched after a closest-value tie-break
    pub ambiguous_resolved: usize,
    pub unmatched: usize,
    /// Alerts that could not be reconciled, including unreadable rows
    pub skipped: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::Matched {
                resolution: Resolution::Unique,
                ..
            } => self.matched += 1,
            MatchOutcome::Matched {
                resolution: Resolution::ClosestValue,
                ..
            } => self.ambiguous_resolved += 1,
            MatchOutcome::Unmatched => self.unmatched += 1,
            MatchOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Count an alert row that never reached the engine
    pub fn record_rejected(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> usize {
        self.matched + self.ambiguous_resolved + self.unmatched + self.skipped
    }

    /// Alerts that produced an output row
    pub fn emitted(&self) -> usize {
        self.matched + self.ambiguous_resolved
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} alerts: {} matched, {} resolved by closest value, {} unmatched, {} skipped",
            self.total(),
            self.matched,
            self.ambiguous_resolved,
            self.unmatched,
            self.skipped
        )
    }
}
