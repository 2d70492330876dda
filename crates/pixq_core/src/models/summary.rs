//! Aggregate view over a batch.

use serde::Serialize;

use super::record::{ConversionRecord, StatusKind};

/// Counts and readiness flags derived from the records of a batch.
///
/// Always computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub idle: usize,
    pub converting: usize,
    pub done: usize,
    pub failed: usize,
    /// At least one record has a downloadable output.
    pub any_done: bool,
    /// Every record is done (false for an empty batch).
    pub all_done: bool,
    /// A convert-all pass is running.
    pub batch_in_progress: bool,
}

impl BatchSummary {
    /// Summarize a record sequence.
    pub fn from_records(records: &[ConversionRecord], batch_in_progress: bool) -> Self {
        let mut summary = Self {
            total: records.len(),
            batch_in_progress,
            ..Self::default()
        };

        for record in records {
            match record.kind() {
                StatusKind::Idle => summary.idle += 1,
                StatusKind::Converting => summary.converting += 1,
                StatusKind::Done => summary.done += 1,
                StatusKind::Failed => summary.failed += 1,
            }
        }

        summary.any_done = summary.done > 0;
        summary.all_done = summary.total > 0 && summary.done == summary.total;
        summary
    }

    /// Records that have reached `done` or `failed`.
    pub fn settled(&self) -> usize {
        self.done + self.failed
    }

    /// Settled fraction in `0.0..=1.0` (0.0 for an empty batch).
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.settled() as f64 / self.total as f64
        }
    }

    /// Whether a convert-all command would do anything right now.
    pub fn can_convert_all(&self) -> bool {
        self.total > 0 && !self.all_done && !self.batch_in_progress
    }

    /// Whether the batch is empty (input-acceptance state).
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
