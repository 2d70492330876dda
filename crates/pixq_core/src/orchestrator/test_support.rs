//! Scripted engine double for queue tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::engine::{
    parse_transcode_command, validate_virtual_name, EngineError, EngineHandle, EngineResult,
};

/// One call made against the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    Write(String),
    Execute(String, String),
    Read(String),
    Delete(String),
}

/// Holds `execute` until the test releases it.
#[derive(Default)]
pub struct ExecuteGate {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory engine that records every call and fails on demand.
///
/// Failure rules match by substring against the virtual name involved.
#[derive(Default)]
pub struct ScriptedEngine {
    loaded: AtomicBool,
    files: Mutex<HashMap<String, Vec<u8>>>,
    ops: Mutex<Vec<EngineOp>>,
    fail_write: Mutex<Vec<String>>,
    fail_execute: Mutex<Vec<String>>,
    fail_read: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<ExecuteGate>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEngine {
    pub fn loaded() -> Self {
        let engine = Self::default();
        engine.loaded.store(true, Ordering::SeqCst);
        engine
    }

    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn fail_write_for(&self, pattern: &str) {
        self.fail_write.lock().push(pattern.to_string());
    }

    pub fn fail_execute_for(&self, pattern: &str) {
        self.fail_execute.lock().push(pattern.to_string());
    }

    pub fn fail_read_for(&self, pattern: &str) {
        self.fail_read.lock().push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_write.lock().clear();
        self.fail_execute.lock().clear();
        self.fail_read.lock().clear();
    }

    pub fn set_gate(&self, gate: Arc<ExecuteGate>) {
        *self.gate.lock() = Some(gate);
    }

    /// Virtual file names currently stored, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn ops(&self) -> Vec<EngineOp> {
        self.ops.lock().clone()
    }

    pub fn op_count(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn execute_count(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, EngineOp::Execute(..)))
            .count()
    }

    /// Highest number of `execute` calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, op: EngineOp) {
        self.ops.lock().push(op);
    }

    fn matches(rules: &Mutex<Vec<String>>, name: &str) -> bool {
        rules.lock().iter().any(|pattern| name.contains(pattern.as_str()))
    }

    fn ensure_loaded(&self) -> EngineResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }
}

#[async_trait]
impl EngineHandle for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&self) -> EngineResult<()> {
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_virtual_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        self.ensure_loaded()?;
        self.record(EngineOp::Write(name.to_string()));
        validate_virtual_name(name)?;
        if Self::matches(&self.fail_write, name) {
            return Err(EngineError::io(name, "scripted write failure"));
        }
        self.files.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn execute(&self, command: &[String]) -> EngineResult<()> {
        self.ensure_loaded()?;
        let (input, output) = parse_transcode_command(command)?;
        self.record(EngineOp::Execute(input.to_string(), output.to_string()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        tokio::task::yield_now().await;

        let result = if !self.files.lock().contains_key(input) {
            Err(EngineError::execution(format!("input '{}' does not exist", input)))
        } else if Self::matches(&self.fail_execute, input) {
            Err(EngineError::execution("scripted codec rejection"))
        } else {
            let produced = format!("converted:{}", input).into_bytes();
            self.files.lock().insert(output.to_string(), produced);
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn read_virtual_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        self.ensure_loaded()?;
        self.record(EngineOp::Read(name.to_string()));
        if Self::matches(&self.fail_read, name) {
            return Err(EngineError::io(name, "scripted read failure"));
        }
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::not_found(name))
    }

    async fn delete_virtual_file(&self, name: &str) -> EngineResult<()> {
        self.ensure_loaded()?;
        self.record(EngineOp::Delete(name.to_string()));
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(name))
    }

    async fn virtual_files(&self) -> EngineResult<Vec<String>> {
        Ok(self.files())
    }
}
