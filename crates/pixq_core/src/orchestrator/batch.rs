//! Batch state owned by the conversion queue.

use std::sync::Arc;

use crate::models::{BatchSummary, ConversionRecord, InputBlob, TargetFormat};

/// The current set of records plus the selected output format.
///
/// Subscribers receive whole `Batch` values; a record is never observed
/// half-updated.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<ConversionRecord>,
    target_format: TargetFormat,
    batch_in_progress: bool,
    /// Bumped on every clear so results from a discarded batch are dropped.
    generation: u64,
}

impl Batch {
    pub(crate) fn new(target_format: TargetFormat) -> Self {
        Self {
            target_format,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ConversionRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty (input-acceptance state).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    pub fn batch_in_progress(&self) -> bool {
        self.batch_in_progress
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_records(&self.records, self.batch_in_progress)
    }

    pub(crate) fn records_mut(&mut self) -> &mut [ConversionRecord] {
        &mut self.records
    }

    pub(crate) fn push(&mut self, blob: InputBlob) {
        self.records.push(ConversionRecord::new(Arc::new(blob)));
    }

    pub(crate) fn set_target_format(&mut self, format: TargetFormat) {
        self.target_format = format;
    }

    pub(crate) fn set_in_progress(&mut self, in_progress: bool) {
        self.batch_in_progress = in_progress;
    }

    /// Drop every record and start a new generation. Returns how many
    /// records were released.
    pub(crate) fn reset(&mut self) -> usize {
        let released = self.records.len();
        self.records.clear();
        self.batch_in_progress = false;
        self.generation += 1;
        released
    }
}
