//! # Common Ancestor Search
//!
//! Finds the highest block both chains agree on. The first probe is the
//! highest candidate; on mismatch the search bisects down towards genesis,
//! which is assumed shared.
//!
//! The search is a pure state machine. The caller fetches the peer's header
//! for each probe and reports whether it matched the local one.

/// Binary search state over `[0, upper]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AncestorSearch {
    /// Highest number known to match.
    low: u64,
    /// Lowest number known to differ (or `upper` before the first probe).
    high: u64,
    upper_checked: bool,
}

impl AncestorSearch {
    pub fn new(upper: u64) -> Self {
        Self {
            low: 0,
            high: upper,
            upper_checked: upper == 0,
        }
    }

    /// Next block number to compare, or `None` once settled.
    pub fn next_probe(&self) -> Option<u64> {
        if !self.upper_checked {
            return Some(self.high);
        }
        if self.high.saturating_sub(self.low) <= 1 {
            return None;
        }
        Some(self.low + (self.high - self.low) / 2)
    }

    /// Record whether the chains agree at `number`.
    pub fn record(&mut self, number: u64, matches: bool) {
        if !self.upper_checked {
            self.upper_checked = true;
            if matches {
                self.low = number;
                self.high = number;
            }
            return;
        }
        if matches {
            self.low = number;
        } else {
            self.high = number;
        }
    }

    /// Best known common block number.
    pub fn ancestor(&self) -> u64 {
        self.low
    }
}
