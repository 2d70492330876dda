//! The conversion queue: batch state, commands and derived views.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::batch::Batch;
use super::convert::{ConversionJob, CONVERSION_FAILED};
use super::delivery::{DeliveryReport, DeliverySink};
use super::errors::{OrchestratorError, OrchestratorResult};
use super::worker::EngineWorker;
use crate::engine::{EngineError, EngineHandle, EngineResult};
use crate::models::{
    BatchSummary, ConversionRecord, InputBlob, OutputPayload, TargetFormat,
};

/// How a single conversion request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The record is now `Done`.
    Done,
    /// The record is now `Failed`.
    Failed,
    /// The batch was cleared while converting; the result was dropped.
    Discarded,
}

/// Totals for one convert-all pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchRunReport {
    pub converted: usize,
    pub failed: usize,
    /// Records already done, or being converted by someone else.
    pub skipped: usize,
    /// The batch was cleared before the pass finished.
    pub abandoned: bool,
}

/// Why a record is being started.
#[derive(Debug, Clone, Copy)]
enum StartMode {
    /// Explicit convert-one: done records are reconverted.
    Explicit,
    /// Convert-all pass of the given generation: done records are skipped.
    Pass { generation: u64 },
}

enum Start {
    Job { job: ConversionJob, generation: u64 },
    AlreadyDone,
    Busy,
    Stale,
    End,
}

struct Shared {
    batch: Mutex<Batch>,
    snapshots: watch::Sender<Batch>,
    worker: EngineWorker,
}

/// Owns the current batch and drives conversions through the engine.
///
/// Cloning yields another handle to the same queue. All conversions go
/// through one [`EngineWorker`], so at most one runs against the engine at
/// any time no matter how many handles issue commands.
#[derive(Clone)]
pub struct ConversionQueue {
    shared: Arc<Shared>,
}

impl ConversionQueue {
    /// Create an empty queue on top of a loaded engine.
    ///
    /// Must be called inside a tokio runtime (the engine worker is spawned
    /// here). Fails with [`OrchestratorError::EngineNotLoaded`] if the
    /// engine has not been loaded; loading is the caller's job.
    pub fn new(
        engine: Arc<dyn EngineHandle>,
        target_format: TargetFormat,
    ) -> OrchestratorResult<Self> {
        if !engine.is_loaded() {
            return Err(OrchestratorError::EngineNotLoaded);
        }

        let batch = Batch::new(target_format);
        let (snapshots, _) = watch::channel(batch.clone());
        let worker = EngineWorker::spawn(engine);

        Ok(Self {
            shared: Arc::new(Shared {
                batch: Mutex::new(batch),
                snapshots,
                worker,
            }),
        })
    }

    /// Subscribe to batch snapshots. Every mutation publishes a new one.
    pub fn subscribe(&self) -> watch::Receiver<Batch> {
        self.shared.snapshots.subscribe()
    }

    /// Copy of the current batch.
    pub fn snapshot(&self) -> Batch {
        self.shared.batch.lock().clone()
    }

    /// Counts and readiness flags for the current batch.
    pub fn summary(&self) -> BatchSummary {
        self.shared.batch.lock().summary()
    }

    pub fn target_format(&self) -> TargetFormat {
        self.shared.batch.lock().target_format()
    }

    /// Copy of one record.
    pub fn record(&self, index: usize) -> Option<ConversionRecord> {
        self.shared.batch.lock().record(index).cloned()
    }

    /// Add one idle record per blob, in order. Returns the batch size.
    pub fn accept_inputs(&self, blobs: Vec<InputBlob>) -> usize {
        if blobs.is_empty() {
            return self.shared.batch.lock().len();
        }

        let added = blobs.len();
        let total = self.mutate(|batch| {
            for blob in blobs {
                batch.push(blob);
            }
            batch.len()
        });
        tracing::info!("Accepted {} inputs ({} in batch)", added, total);
        total
    }

    /// Select the format for subsequent conversions.
    ///
    /// Rejected while a convert-all pass runs. Records already done keep
    /// the output they were produced with.
    pub fn set_format(&self, format: TargetFormat) -> OrchestratorResult<()> {
        self.mutate(|batch| {
            if batch.batch_in_progress() {
                return Err(OrchestratorError::BatchInProgress);
            }
            batch.set_target_format(format);
            Ok(())
        })?;
        tracing::info!("Target format set to {}", format);
        Ok(())
    }

    /// Convert one record with the current target format.
    ///
    /// A done record is reconverted. Engine failures end up on the record as
    /// `Failed`; only command-level problems are returned as errors.
    pub async fn convert_one(&self, index: usize) -> OrchestratorResult<ConvertOutcome> {
        match self.start(index, StartMode::Explicit)? {
            Start::Job { job, generation } => self.run_job(job, generation).await,
            Start::Busy => Err(OrchestratorError::record_busy(index)),
            // Explicit starts never skip or go stale
            Start::AlreadyDone | Start::Stale | Start::End => Ok(ConvertOutcome::Discarded),
        }
    }

    /// Convert every record that is not done, one after another.
    ///
    /// Failures do not stop the pass. A record is fully settled, engine
    /// cleanup included, before the next one starts. Clearing the batch
    /// mid-pass abandons the rest of it.
    pub async fn convert_all(&self) -> OrchestratorResult<BatchRunReport> {
        let generation = self.mutate(|batch| {
            if batch.batch_in_progress() {
                return Err(OrchestratorError::BatchInProgress);
            }
            batch.set_in_progress(true);
            Ok(batch.generation())
        })?;
        let _pass = PassGuard {
            queue: self.clone(),
            generation,
        };

        let total = self.shared.batch.lock().len();
        tracing::info!("Starting batch conversion of {} records", total);

        let mut report = BatchRunReport::default();
        let mut index = 0;
        loop {
            match self.start(index, StartMode::Pass { generation })? {
                Start::Job { job, generation } => match self.run_job(job, generation).await? {
                    ConvertOutcome::Done => report.converted += 1,
                    ConvertOutcome::Failed => report.failed += 1,
                    ConvertOutcome::Discarded => {
                        report.abandoned = true;
                        break;
                    }
                },
                Start::AlreadyDone | Start::Busy => report.skipped += 1,
                Start::Stale => {
                    report.abandoned = true;
                    break;
                }
                Start::End => break,
            }
            index += 1;
        }

        if report.abandoned {
            tracing::info!("Batch conversion abandoned after clear");
        } else {
            tracing::info!(
                "Batch conversion complete: {} converted, {} failed, {} skipped",
                report.converted,
                report.failed,
                report.skipped
            );
        }
        Ok(report)
    }

    /// Deliver every done output to `sink`, in batch order, named with the
    /// current target format's extension.
    ///
    /// Does not change the batch and can be repeated. A failed delivery is
    /// logged and reported without stopping the others.
    pub async fn download_all(&self, sink: &dyn DeliverySink) -> DeliveryReport {
        let ready: Vec<(String, OutputPayload)> = {
            let batch = self.shared.batch.lock();
            let format = batch.target_format();
            batch
                .records()
                .iter()
                .filter_map(|record| {
                    let name = record.download_name(format)?;
                    let payload = record.output()?.clone();
                    Some((name, payload))
                })
                .collect()
        };

        let mut report = DeliveryReport::default();
        for (name, payload) in ready {
            match sink.deliver(&name, &payload).await {
                Ok(()) => report.delivered.push(name),
                Err(e) => {
                    tracing::warn!("Failed to deliver {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    /// Release every output and empty the batch.
    ///
    /// A conversion still in flight finishes inside the engine, but its
    /// result is discarded. Returns how many records were released.
    pub fn clear(&self) -> usize {
        let released = self.mutate(|batch| batch.reset());
        tracing::info!("Cleared batch ({} records released)", released);
        released
    }

    /// Apply a change under the lock and publish the resulting snapshot.
    fn mutate<R>(&self, change: impl FnOnce(&mut Batch) -> R) -> R {
        let mut batch = self.shared.batch.lock();
        let result = change(&mut batch);
        self.shared.snapshots.send_replace(batch.clone());
        result
    }

    fn start(&self, index: usize, mode: StartMode) -> OrchestratorResult<Start> {
        self.mutate(|batch| {
            if let StartMode::Pass { generation } = mode {
                if batch.generation() != generation {
                    return Ok(Start::Stale);
                }
            }

            let len = batch.len();
            let generation = batch.generation();
            let format = batch.target_format();
            let Some(record) = batch.records_mut().get_mut(index) else {
                return match mode {
                    StartMode::Explicit => Err(OrchestratorError::record_not_found(index, len)),
                    StartMode::Pass { .. } => Ok(Start::End),
                };
            };

            if matches!(mode, StartMode::Pass { .. }) && !record.needs_conversion() {
                return Ok(Start::AlreadyDone);
            }
            if record.begin().is_err() {
                return Ok(Start::Busy);
            }
            Ok(Start::Job {
                job: ConversionJob {
                    index,
                    source: Arc::clone(record.source()),
                    format,
                },
                generation,
            })
        })
    }

    /// Run a started job to completion and settle its record.
    ///
    /// Submission and settling happen on a spawned task, so a record is
    /// still settled when the caller's future is dropped mid-conversion.
    async fn run_job(
        &self,
        job: ConversionJob,
        generation: u64,
    ) -> OrchestratorResult<ConvertOutcome> {
        let index = job.index;
        let name = job.source.name().to_string();

        let queue = self.clone();
        let task = tokio::spawn(async move { queue.submit_and_settle(job, generation).await });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Conversion task for {} did not finish: {}", name, e);
                let failure = Err(EngineError::execution(e.to_string()));
                self.settle(index, &name, generation, failure);
                Err(OrchestratorError::WorkerUnavailable)
            }
        }
    }

    async fn submit_and_settle(
        &self,
        job: ConversionJob,
        generation: u64,
    ) -> OrchestratorResult<ConvertOutcome> {
        let index = job.index;
        let name = job.source.name().to_string();

        match self.shared.worker.submit(job).await {
            Ok(result) => Ok(self.settle(index, &name, generation, result)),
            Err(e) => {
                self.settle(
                    index,
                    &name,
                    generation,
                    Err(EngineError::execution(e.to_string())),
                );
                Err(e)
            }
        }
    }

    fn settle(
        &self,
        index: usize,
        name: &str,
        generation: u64,
        result: EngineResult<OutputPayload>,
    ) -> ConvertOutcome {
        self.mutate(|batch| {
            if batch.generation() != generation {
                tracing::debug!("Discarding result for {} from a cleared batch", name);
                return ConvertOutcome::Discarded;
            }
            let Some(record) = batch.records_mut().get_mut(index) else {
                return ConvertOutcome::Discarded;
            };

            match result {
                Ok(payload) => {
                    tracing::info!(
                        "Converted {} -> {} ({} bytes)",
                        name,
                        payload.format(),
                        payload.len()
                    );
                    record.settle(Ok(payload));
                    ConvertOutcome::Done
                }
                Err(e) => {
                    tracing::warn!("Conversion of {} failed: {}", name, e);
                    record.settle(Err(CONVERSION_FAILED.to_string()));
                    ConvertOutcome::Failed
                }
            }
        })
    }
}

/// Clears the in-progress flag when a pass ends, even if the pass future is
/// dropped early. Leaves a newer generation alone.
struct PassGuard {
    queue: ConversionQueue,
    generation: u64,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.queue.mutate(|batch| {
            if batch.generation() == generation {
                batch.set_in_progress(false);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::delivery::DeliveryError;
    use crate::models::StatusKind;
    use crate::orchestrator::test_support::{ExecuteGate, ScriptedEngine};
    use std::time::Duration;

    fn blob(name: &str) -> InputBlob {
        InputBlob::new(name, format!("bytes of {name}").into_bytes())
    }

    fn queue_with(engine: &Arc<ScriptedEngine>, names: &[&str]) -> ConversionQueue {
        let queue = ConversionQueue::new(engine.clone(), TargetFormat::Png).unwrap();
        queue.accept_inputs(names.iter().map(|n| blob(n)).collect());
        queue
    }

    /// Collects deliveries in memory.
    #[derive(Default)]
    struct CollectingSink {
        delivered: Mutex<Vec<(String, &'static str)>>,
        reject: Option<String>,
    }

    #[async_trait::async_trait]
    impl DeliverySink for CollectingSink {
        async fn deliver(&self, filename: &str, payload: &OutputPayload) -> Result<(), DeliveryError> {
            if self.reject.as_deref() == Some(filename) {
                return Err(DeliveryError::Rejected("disk full".to_string()));
            }
            self.delivered
                .lock()
                .push((filename.to_string(), payload.media_type()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn requires_loaded_engine() {
        let engine = Arc::new(ScriptedEngine::unloaded());
        let result = ConversionQueue::new(engine, TargetFormat::Png);
        assert!(matches!(result, Err(OrchestratorError::EngineNotLoaded)));
    }

    #[tokio::test]
    async fn accepted_inputs_start_idle() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = ConversionQueue::new(engine.clone(), TargetFormat::Png).unwrap();
        assert!(queue.summary().is_empty());

        assert_eq!(queue.accept_inputs(vec![blob("a.jpg"), blob("b.jpg")]), 2);
        assert_eq!(queue.accept_inputs(Vec::new()), 2);

        let summary = queue.summary();
        assert_eq!(summary.idle, 2);
        assert!(summary.can_convert_all());
        assert_eq!(engine.op_count(), 0);
    }

    #[tokio::test]
    async fn convert_one_produces_png_named_after_source() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["photo.HEIC.jpg"]);

        let outcome = queue.convert_one(0).await.unwrap();
        assert_eq!(outcome, ConvertOutcome::Done);

        let record = queue.record(0).unwrap();
        assert_eq!(record.kind(), StatusKind::Done);
        assert_eq!(record.output().unwrap().media_type(), "image/png");
        assert_eq!(
            record.download_name(queue.target_format()).as_deref(),
            Some("photo.HEIC.png")
        );
        assert!(engine.files().is_empty());
    }

    #[tokio::test]
    async fn convert_one_rejects_unknown_index() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg"]);

        let err = queue.convert_one(4).await.unwrap_err();
        assert_eq!(err, OrchestratorError::record_not_found(4, 1));
    }

    #[tokio::test]
    async fn convert_all_settles_every_record() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg", "b c.png", "d.webp", "e.gif"]);
        engine.fail_execute_for("d.webp");

        let report = queue.convert_all().await.unwrap();
        assert_eq!(report.converted, 3);
        assert_eq!(report.failed, 1);
        assert!(!report.abandoned);

        let batch = queue.snapshot();
        assert!(batch
            .records()
            .iter()
            .all(|r| matches!(r.kind(), StatusKind::Done | StatusKind::Failed)));
        assert!(!batch.batch_in_progress());
        assert!(engine.files().is_empty());
    }

    #[tokio::test]
    async fn failure_in_middle_does_not_stop_the_pass() {
        crate::logging::init_test_tracing();
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["one.jpg", "two.jpg", "three.jpg"]);
        engine.fail_execute_for("two.jpg");

        queue.convert_all().await.unwrap();

        let batch = queue.snapshot();
        assert_eq!(batch.record(0).unwrap().kind(), StatusKind::Done);
        assert_eq!(batch.record(2).unwrap().kind(), StatusKind::Done);
        let failed = batch.record(1).unwrap();
        assert_eq!(failed.kind(), StatusKind::Failed);
        assert!(!failed.failure_reason().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_pass_touches_nothing_when_all_done() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg", "b.jpg"]);

        queue.convert_all().await.unwrap();
        let ops_after_first = engine.op_count();

        let report = queue.convert_all().await.unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.converted, 0);
        assert_eq!(engine.op_count(), ops_after_first);
        assert!(queue.summary().all_done);
    }

    #[tokio::test]
    async fn later_pass_retries_failed_records() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["flaky.jpg", "fine.jpg"]);
        engine.fail_execute_for("flaky.jpg");

        queue.convert_all().await.unwrap();
        assert_eq!(queue.record(0).unwrap().kind(), StatusKind::Failed);

        engine.clear_failures();
        let executes_before = engine.execute_count();
        let report = queue.convert_all().await.unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(engine.execute_count(), executes_before + 1);
        assert_eq!(queue.record(0).unwrap().kind(), StatusKind::Done);
        assert!(queue.record(0).unwrap().failure_reason().is_none());
    }

    #[tokio::test]
    async fn format_change_applies_to_later_conversions_only() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["old.jpg", "new.jpg"]);

        queue.convert_one(0).await.unwrap();
        queue.set_format(TargetFormat::Webp).unwrap();
        queue.convert_all().await.unwrap();

        // The earlier output is kept as produced
        let first = queue.record(0).unwrap();
        assert_eq!(first.output().unwrap().format(), TargetFormat::Png);
        assert_eq!(
            first.download_name(TargetFormat::Webp).as_deref(),
            Some("old.webp")
        );

        let second = queue.record(1).unwrap();
        assert_eq!(second.output().unwrap().media_type(), "image/webp");

        // Explicit reconversion picks up the new format
        queue.convert_one(0).await.unwrap();
        assert_eq!(
            queue.record(0).unwrap().output().unwrap().format(),
            TargetFormat::Webp
        );
    }

    #[tokio::test]
    async fn download_names_follow_current_format() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["old.jpg", "new.jpg"]);
        queue.convert_one(0).await.unwrap();
        queue.set_format(TargetFormat::Webp).unwrap();
        queue.convert_one(1).await.unwrap();

        let sink = CollectingSink::default();
        let report = queue.download_all(&sink).await;
        assert_eq!(report.delivered, vec!["old.webp", "new.webp"]);

        let delivered = sink.delivered.lock().clone();
        assert_eq!(delivered[0], ("old.webp".to_string(), "image/png"));
        assert_eq!(delivered[1], ("new.webp".to_string(), "image/webp"));
    }

    #[tokio::test]
    async fn set_format_rejected_during_pass() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let gate = Arc::new(ExecuteGate::default());
        engine.set_gate(gate.clone());
        let queue = queue_with(&engine, &["a.jpg"]);

        let pass = tokio::spawn({
            let queue = queue.clone();
            async move { queue.convert_all().await }
        });
        gate.entered.notified().await;

        assert_eq!(
            queue.set_format(TargetFormat::Jpeg),
            Err(OrchestratorError::BatchInProgress)
        );
        assert!(matches!(
            queue.convert_all().await,
            Err(OrchestratorError::BatchInProgress)
        ));
        assert_eq!(queue.summary().converting, 1);

        gate.release.notify_one();
        pass.await.unwrap().unwrap();
        assert!(queue.set_format(TargetFormat::Jpeg).is_ok());
    }

    #[tokio::test]
    async fn clear_mid_pass_discards_stale_result() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let gate = Arc::new(ExecuteGate::default());
        engine.set_gate(gate.clone());
        let queue = queue_with(&engine, &["a.jpg", "b.jpg"]);

        let pass = tokio::spawn({
            let queue = queue.clone();
            async move { queue.convert_all().await }
        });
        gate.entered.notified().await;

        assert_eq!(queue.clear(), 2);
        queue.accept_inputs(vec![blob("fresh.jpg")]);
        gate.release.notify_one();

        let report = pass.await.unwrap().unwrap();
        assert!(report.abandoned);

        let batch = queue.snapshot();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.record(0).unwrap().kind(), StatusKind::Idle);
        assert!(!batch.batch_in_progress());
        assert!(engine.files().is_empty());
        assert_eq!(engine.execute_count(), 1);
    }

    #[tokio::test]
    async fn download_all_delivers_done_records_in_order() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg", "b.jpg", "c.tiff", "d.jpg"]);
        engine.fail_execute_for("b.jpg");
        queue.convert_all().await.unwrap();
        queue.accept_inputs(vec![blob("late.jpg")]);

        let sink = CollectingSink::default();
        let report = queue.download_all(&sink).await;
        assert_eq!(report.delivered, vec!["a.png", "c.png", "d.png"]);
        assert!(report.is_complete());

        // Repeatable, and never mutates the batch
        let before = queue.summary();
        queue.download_all(&sink).await;
        assert_eq!(sink.delivered.lock().len(), 6);
        assert_eq!(queue.summary(), before);
    }

    #[tokio::test]
    async fn download_all_continues_past_delivery_failure() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg", "b.jpg"]);
        queue.convert_all().await.unwrap();

        let sink = CollectingSink {
            reject: Some("a.png".to_string()),
            ..CollectingSink::default()
        };
        let report = queue.download_all(&sink).await;
        assert_eq!(report.delivered, vec!["b.png"]);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn clear_returns_to_empty_state() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = queue_with(&engine, &["a.jpg"]);
        queue.convert_all().await.unwrap();
        assert!(queue.summary().any_done);

        queue.clear();
        let summary = queue.summary();
        assert!(summary.is_empty());
        assert!(!summary.any_done);
        assert_eq!(queue.target_format(), TargetFormat::Png);
    }

    #[tokio::test]
    async fn subscribers_see_each_transition() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let queue = ConversionQueue::new(engine.clone(), TargetFormat::Png).unwrap();
        let mut rx = queue.subscribe();

        queue.accept_inputs(vec![blob("a.jpg")]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().summary().idle, 1);

        queue.convert_one(0).await.unwrap();
        assert_eq!(rx.borrow_and_update().summary().done, 1);
    }

    #[tokio::test]
    async fn explicit_convert_one_on_converting_record_is_busy() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let gate = Arc::new(ExecuteGate::default());
        engine.set_gate(gate.clone());
        let queue = queue_with(&engine, &["a.jpg"]);

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.convert_one(0).await }
        });
        gate.entered.notified().await;

        assert_eq!(
            queue.convert_one(0).await,
            Err(OrchestratorError::record_busy(0))
        );

        gate.release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), ConvertOutcome::Done);
    }

    #[tokio::test]
    async fn builtin_engine_end_to_end() {
        use crate::engine::BuiltinEngine;
        use crate::orchestrator::DirectoryDelivery;
        use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([10, 120, 240])));
        let mut png = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let engine = Arc::new(BuiltinEngine::new());
        engine.load().await.unwrap();
        let queue = ConversionQueue::new(engine.clone(), TargetFormat::Jpeg).unwrap();
        queue.accept_inputs(vec![
            InputBlob::new("holiday photo.png", png),
            InputBlob::new("broken.png", b"definitely not an image".to_vec()),
        ]);

        let report = queue.convert_all().await.unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(report.failed, 1);
        assert!(engine.virtual_files().await.unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let delivered = queue.download_all(&DirectoryDelivery::new(dir.path())).await;
        assert_eq!(delivered.delivered, vec!["holiday photo.jpg"]);

        let saved = std::fs::read(dir.path().join("holiday photo.jpg")).unwrap();
        assert_eq!(image::guess_format(&saved).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn abandoned_convert_one_still_settles_record() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let gate = Arc::new(ExecuteGate::default());
        engine.set_gate(gate.clone());
        let queue = queue_with(&engine, &["a.jpg"]);
        let mut rx = queue.subscribe();

        let waited = tokio::time::timeout(Duration::from_millis(50), queue.convert_one(0)).await;
        assert!(waited.is_err());

        gate.entered.notified().await;
        gate.release.notify_one();
        rx.wait_for(|batch| {
            batch
                .record(0)
                .is_some_and(|r| r.kind() != StatusKind::Converting)
        })
        .await
        .unwrap();

        assert_eq!(queue.record(0).unwrap().kind(), StatusKind::Done);
        assert!(engine.files().is_empty());

        // The record is not stuck and can be converted again
        gate.release.notify_one();
        assert_eq!(queue.convert_one(0).await, Ok(ConvertOutcome::Done));
    }
}
