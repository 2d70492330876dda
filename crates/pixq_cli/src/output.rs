//! Output renderers and formatting helpers for CLI commands.

use std::path::Path;

use anyhow::anyhow;
use pixq_core::models::{BatchSummary, ConversionRecord, RecordStatus, TargetFormat};
use pixq_core::orchestrator::{Batch, DeliveryReport};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cli::{CliError, CliResult, OutputFormat};

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

/// Print a progress line to stderr whenever the batch counts change.
///
/// Runs until aborted or until the queue is dropped.
pub(crate) fn spawn_progress(mut snapshots: watch::Receiver<Batch>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<BatchSummary> = None;
        while snapshots.changed().await.is_ok() {
            let summary = snapshots.borrow_and_update().summary();
            if last == Some(summary) {
                continue;
            }
            eprintln!("{}", progress_line(&summary));
            last = Some(summary);
        }
    })
}

#[must_use]
pub(crate) fn progress_line(summary: &BatchSummary) -> String {
    format!(
        "[{:>3.0}%] {}/{} settled ({} done, {} failed, {} converting)",
        summary.progress() * 100.0,
        summary.settled(),
        summary.total,
        summary.done,
        summary.failed,
        summary.converting
    )
}

pub(crate) fn render_batch(batch: &Batch, format: OutputFormat) -> CliResult<()> {
    let summary = batch.summary();
    match format {
        OutputFormat::Json => {
            let records: Vec<Value> = batch
                .records()
                .iter()
                .enumerate()
                .map(|(index, record)| record_json(index, record, batch.target_format()))
                .collect();
            print_json(&json!({
                "target_format": batch.target_format(),
                "summary": summary,
                "records": records,
            }))?;
        }
        OutputFormat::Table => {
            println!("{:>3} {:<10} {:>10} {:<32} RESULT", "#", "STATUS", "SIZE", "NAME");
            for (index, record) in batch.records().iter().enumerate() {
                let (size, result) = match record.status() {
                    RecordStatus::Done(payload) => (
                        format_bytes(payload.len()),
                        record
                            .download_name(batch.target_format())
                            .unwrap_or_default(),
                    ),
                    RecordStatus::Failed { reason } => (String::new(), reason.clone()),
                    RecordStatus::Idle | RecordStatus::Converting => {
                        (String::new(), String::new())
                    }
                };
                println!(
                    "{:>3} {:<10} {:>10} {:<32} {}",
                    index + 1,
                    record.kind().as_str(),
                    size,
                    record.source().name(),
                    result
                );
            }
            println!(
                "{} done, {} failed, {} not converted (of {})",
                summary.done,
                summary.failed,
                summary.idle + summary.converting,
                summary.total
            );
        }
    }
    Ok(())
}

fn record_json(index: usize, record: &ConversionRecord, format: TargetFormat) -> Value {
    json!({
        "index": index + 1,
        "name": record.source().name(),
        "status": record.kind().as_str(),
        "output": record.download_name(format),
        "media_type": record.output().map(|p| p.media_type()),
        "bytes": record.output().map(|p| p.len()),
        "reason": record.failure_reason(),
    })
}

pub(crate) fn render_delivery(
    report: &DeliveryReport,
    dir: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let failed: Vec<Value> = report
                .failed
                .iter()
                .map(|(name, reason)| json!({ "name": name, "reason": reason }))
                .collect();
            print_json(&json!({
                "directory": dir.display().to_string(),
                "saved": report.delivered,
                "failed": failed,
            }))?;
        }
        OutputFormat::Table => {
            if !report.delivered.is_empty() {
                println!("saved {} file(s) to {}", report.delivered.len(), dir.display());
            }
            for (name, reason) in &report.failed {
                println!("could not save {name}: {reason}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_formats(format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let formats: Vec<Value> = TargetFormat::ALL
                .iter()
                .map(|f| {
                    json!({
                        "name": f.as_str(),
                        "extension": f.extension(),
                        "media_type": f.media_type(),
                    })
                })
                .collect();
            print_json(&Value::Array(formats))?;
        }
        OutputFormat::Table => {
            println!("{:<6} {:<5} MEDIA TYPE", "FORMAT", "EXT");
            for f in TargetFormat::ALL {
                println!("{:<6} {:<5} {}", f.as_str(), f.extension(), f.media_type());
            }
        }
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let value = bytes as f64;
    if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
