//! Data models for pixq.
//!
//! This module contains the core data structures shared by the engine,
//! orchestrator and front ends:
//! - Output formats
//! - Input blobs
//! - Conversion records and their status
//! - Batch summaries

mod blob;
mod format;
mod record;
mod summary;

pub use blob::InputBlob;
pub use format::{TargetFormat, UnknownFormat};
pub use record::{AlreadyConverting, ConversionRecord, OutputPayload, RecordStatus, StatusKind};
pub use summary::BatchSummary;
