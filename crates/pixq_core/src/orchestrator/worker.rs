//! Single worker that owns every interaction with the engine.
//!
//! Conversion requests are queued on an mpsc channel and handled strictly
//! one after another, each through its cleanup phase, so two conversions
//! never share the engine's virtual filesystem at the same time.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::convert::{run_conversion, ConversionJob};
use super::errors::{OrchestratorError, OrchestratorResult};
use crate::engine::{EngineHandle, EngineResult};
use crate::models::OutputPayload;

const COMMAND_BUFFER: usize = 32;

enum WorkerCommand {
    Convert {
        job: ConversionJob,
        respond_to: oneshot::Sender<EngineResult<OutputPayload>>,
    },
}

/// Handle for submitting conversions to the engine worker.
///
/// The worker task exits once every handle is dropped.
#[derive(Clone)]
pub struct EngineWorker {
    commands: mpsc::Sender<WorkerCommand>,
}

impl EngineWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(engine: Arc<dyn EngineHandle>) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(engine, rx));
        Self { commands }
    }

    /// Queue a conversion and wait for its settled result.
    ///
    /// The outer error means the worker is gone; the inner result is the
    /// engine's verdict on this one record.
    pub async fn submit(
        &self,
        job: ConversionJob,
    ) -> OrchestratorResult<EngineResult<OutputPayload>> {
        let (respond_to, rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Convert { job, respond_to })
            .await
            .map_err(|_| OrchestratorError::WorkerUnavailable)?;
        rx.await.map_err(|_| OrchestratorError::WorkerUnavailable)
    }
}

async fn run(engine: Arc<dyn EngineHandle>, mut commands: mpsc::Receiver<WorkerCommand>) {
    tracing::debug!("Engine worker started ({})", engine.name());

    while let Some(command) = commands.recv().await {
        match command {
            WorkerCommand::Convert { job, respond_to } => {
                tracing::debug!(
                    "Converting record {} ({}) to {}",
                    job.index,
                    job.source.name(),
                    job.format
                );
                let result = run_conversion(engine.as_ref(), &job).await;
                // Caller may have stopped waiting; the attempt is still cleaned up.
                let _ = respond_to.send(result);
            }
        }
    }

    tracing::debug!("Engine worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputBlob, TargetFormat};
    use crate::orchestrator::test_support::ScriptedEngine;

    fn job(index: usize) -> ConversionJob {
        ConversionJob {
            index,
            source: Arc::new(InputBlob::new(format!("{index}.jpg"), b"data".to_vec())),
            format: TargetFormat::Png,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_run_one_at_a_time() {
        let engine = Arc::new(ScriptedEngine::loaded());
        let worker = EngineWorker::spawn(engine.clone());

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let worker = worker.clone();
                tokio::spawn(async move { worker.submit(job(i)).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(result.is_ok());
        }

        assert_eq!(engine.execute_count(), 6);
        assert_eq!(engine.max_in_flight(), 1);
        assert!(engine.files().is_empty());
    }
}
