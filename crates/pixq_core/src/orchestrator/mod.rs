//! Conversion queue orchestration.
//!
//! This module owns the batch of records and moves each one through its
//! lifecycle against a loaded engine. Every conversion goes through a
//! single worker task, so the engine never runs two transcodes at once.
//!
//! # Architecture
//!
//! ```text
//! ConversionQueue (batch state + watch snapshots)
//!     │  convert_one / convert_all
//!     ▼
//! EngineWorker (mpsc, one job at a time)
//!     │  run_conversion
//!     ▼
//! EngineHandle: write → execute → read → delete output → delete input
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pixq_core::engine::BuiltinEngine;
//! use pixq_core::models::{InputBlob, TargetFormat};
//! use pixq_core::orchestrator::{ConversionQueue, DirectoryDelivery};
//!
//! let engine = Arc::new(BuiltinEngine::new());
//! engine.load().await?;
//!
//! let queue = ConversionQueue::new(engine, TargetFormat::Png)?;
//! queue.accept_inputs(vec![InputBlob::new("photo.jpg", bytes)]);
//! queue.convert_all().await?;
//! queue.download_all(&DirectoryDelivery::new("converted")).await;
//! ```

mod batch;
mod convert;
mod delivery;
mod errors;
mod queue;
#[cfg(test)]
mod test_support;
mod worker;

pub use batch::Batch;
pub use convert::{
    run_conversion, virtual_input_name, virtual_output_name, ConversionJob, CONVERSION_FAILED,
};
pub use delivery::{DeliveryError, DeliveryReport, DeliverySink, DirectoryDelivery};
pub use errors::{OrchestratorError, OrchestratorResult};
pub use queue::{BatchRunReport, ConversionQueue, ConvertOutcome};
pub use worker::EngineWorker;
