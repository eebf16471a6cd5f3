//! Shrink-wrap statistics

use serde::Serialize;
use std::fmt;

/// Counters reported by the pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShrinkWrapStats {
    /// Calls wrapped behind a single comparison
    pub wrapped_one_cond: u64,
    /// Calls wrapped behind two comparisons
    pub wrapped_two_cond: u64,
}

impl ShrinkWrapStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one wrapped call guarded by `conditions` comparisons
    pub fn record(&mut self, conditions: usize) {
        match conditions {
            1 => self.wrapped_one_cond += 1,
            _ => self.wrapped_two_cond += 1,
        }
    }

    pub fn merge(&mut self, other: &ShrinkWrapStats) {
        self.wrapped_one_cond += other.wrapped_one_cond;
        self.wrapped_two_cond += other.wrapped_two_cond;
    }

    pub fn total(&self) -> u64 {
        self.wrapped_one_cond + self.wrapped_two_cond
    }
}

impl fmt::Display for ShrinkWrapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Shrink-Wrap Statistics ===")?;
        writeln!(f, "One-condition wrappers inserted: {}", self.wrapped_one_cond)?;
        writeln!(f, "Two-condition wrappers inserted: {}", self.wrapped_two_cond)?;
        write!(f, "Total calls wrapped: {}", self.total())
    }
}
