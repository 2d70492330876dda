//! Single-record conversion against an engine.
//!
//! Runs write → execute → read, then always cleans both virtual names out
//! of the engine so repeated attempts never leave entries behind.

use std::sync::Arc;

use crate::engine::{transcode_command, EngineHandle, EngineResult};
use crate::models::{InputBlob, OutputPayload, TargetFormat};

/// Diagnostic stored on a record whose conversion failed.
pub const CONVERSION_FAILED: &str = "Conversion failed";

/// Everything the engine worker needs to convert one record.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Position of the record in its batch.
    pub index: usize,
    /// Input bytes and display name.
    pub source: Arc<InputBlob>,
    /// Format to produce.
    pub format: TargetFormat,
}

impl ConversionJob {
    /// Virtual name the input bytes are written under.
    pub fn input_name(&self) -> String {
        virtual_input_name(self.index, self.source.name())
    }

    /// Virtual name the engine writes the output to.
    pub fn output_name(&self) -> String {
        virtual_output_name(self.index, self.format)
    }
}

/// `input_<index>_<sanitized name>`.
pub fn virtual_input_name(index: usize, display_name: &str) -> String {
    format!("input_{}_{}", index, sanitize_name(display_name))
}

/// `output_<index>.<extension>`.
pub fn virtual_output_name(index: usize, format: TargetFormat) -> String {
    format!("output_{}.{}", index, format.extension())
}

/// Replace characters the engine rejects in virtual names.
fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '/' | '\\' => '_',
            _ => c,
        })
        .collect();
    if sanitized.is_empty() {
        "blob".to_string()
    } else {
        sanitized
    }
}

/// Convert one record and clean up after it.
///
/// Cleanup deletes the output name (it may never have been produced) and
/// then the input name (it may never have been written). Delete failures
/// are ignored.
pub async fn run_conversion(
    engine: &dyn EngineHandle,
    job: &ConversionJob,
) -> EngineResult<OutputPayload> {
    let input = job.input_name();
    let output = job.output_name();

    let result = transcode(engine, job, &input, &output).await;

    discard(engine, &output).await;
    discard(engine, &input).await;

    result
}

async fn transcode(
    engine: &dyn EngineHandle,
    job: &ConversionJob,
    input: &str,
    output: &str,
) -> EngineResult<OutputPayload> {
    engine.write_virtual_file(input, job.source.bytes()).await?;
    engine.execute(&transcode_command(input, output)).await?;
    let bytes = engine.read_virtual_file(output).await?;
    Ok(OutputPayload::new(bytes, job.format))
}

async fn discard(engine: &dyn EngineHandle, name: &str) {
    if let Err(e) = engine.delete_virtual_file(name).await {
        tracing::trace!("Cleanup skipped for {}: {}", name, e);
    }
}
