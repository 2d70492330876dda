//! pixq core - backend logic for batch image conversion
//!
//! This crate contains the conversion queue and engine plumbing with zero
//! UI dependencies. It can be driven by the CLI or any other front end that
//! consumes batch snapshots.

pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod orchestrator;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
