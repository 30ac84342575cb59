//! Per-job bookkeeping: progress percentage and summary buckets

use crate::types::{FailedTarget, JobSummary, TargetResult};

/// `round(100 * (index + 1) / total)`, rounding half up
///
/// Monotonically non-decreasing in `index` and exactly 100 for the last target.
pub fn percent_complete(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (200 * (index + 1) + total) / (2 * total);
    percent.min(100) as u8
}

/// Accumulates results in dispatch order
#[derive(Debug)]
pub struct SummaryLedger {
    total: usize,
    attempted: usize,
    summary: JobSummary,
}

impl SummaryLedger {
    /// Ledger for a job with `total` targets
    pub fn new(total: usize) -> Self {
        Self {
            total,
            attempted: 0,
            summary: JobSummary::default(),
        }
    }

    /// Put `target` in its bucket and return the progress percentage
    pub fn record(&mut self, target: &str, result: &TargetResult) -> u8 {
        match result {
            TargetResult::Success { .. } | TargetResult::Scheduled { .. } => {
                self.summary.successful_targets.push(target.to_string());
            }
            TargetResult::Failure { reason, .. } => {
                self.summary.failed_targets.push(FailedTarget {
                    target: target.to_string(),
                    reason: reason.clone(),
                });
            }
        }
        let percent = percent_complete(self.attempted, self.total);
        self.attempted += 1;
        percent
    }

    /// Targets still to attempt
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.attempted)
    }

    /// Final buckets
    pub fn finish(self) -> JobSummary {
        self.summary
    }
}
