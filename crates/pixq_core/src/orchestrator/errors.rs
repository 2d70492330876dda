//! Error types for the conversion queue.
//!
//! Per-record engine failures never surface here: they are downgraded to a
//! `Failed` record. These errors only describe commands that could not be
//! carried out at all.

use thiserror::Error;

/// Errors returned by [`ConversionQueue`](super::ConversionQueue) commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The engine handed to the queue has not completed `load`.
    #[error("Conversion engine is not loaded")]
    EngineNotLoaded,

    /// The index does not reference a record in the current batch.
    #[error("No record at index {index} (batch has {len} records)")]
    RecordNotFound { index: usize, len: usize },

    /// The record already has a conversion in flight.
    #[error("Record {index} is already converting")]
    RecordBusy { index: usize },

    /// A convert-all pass is running.
    #[error("A batch conversion is already in progress")]
    BatchInProgress,

    /// The engine worker task is gone (runtime shutting down).
    #[error("Engine worker is unavailable")]
    WorkerUnavailable,
}

impl OrchestratorError {
    /// Create a record not found error.
    pub fn record_not_found(index: usize, len: usize) -> Self {
        Self::RecordNotFound { index, len }
    }

    /// Create a record busy error.
    pub fn record_busy(index: usize) -> Self {
        Self::RecordBusy { index }
    }
}

/// Result type for queue commands.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_displays_bounds() {
        let msg = OrchestratorError::record_not_found(5, 3).to_string();
        assert!(msg.contains("index 5"));
        assert!(msg.contains("3 records"));
    }
}
