//! Engine that shells out to an `ffmpeg` binary.
//!
//! The virtual filesystem is a private work directory; commands run with
//! that directory as the current directory so virtual names resolve
//! relative to it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::process::Command;

use super::command::validate_virtual_name;
use super::error::{EngineError, EngineResult};
use super::EngineHandle;

/// Number of stderr lines kept in execution errors.
const STDERR_TAIL_LINES: usize = 8;

/// Engine backed by an external ffmpeg process per command.
pub struct FfmpegEngine {
    /// ffmpeg executable (name on PATH or absolute path).
    binary: PathBuf,
    /// Directory holding virtual files.
    work_dir: PathBuf,
    /// Set once `load` succeeds.
    loaded: AtomicBool,
}

impl FfmpegEngine {
    /// Create an unloaded engine.
    ///
    /// # Arguments
    /// * `binary` - ffmpeg executable
    /// * `work_dir` - Directory used as the virtual filesystem (created on load)
    pub fn new(binary: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Directory holding virtual files.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn ensure_loaded(&self) -> EngineResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    fn resolve(&self, name: &str) -> EngineResult<PathBuf> {
        validate_virtual_name(name)?;
        Ok(self.work_dir.join(name))
    }
}

#[async_trait]
impl EngineHandle for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self) -> EngineResult<()> {
        tokio::fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            EngineError::load(format!(
                "Failed to create engine work directory {}: {}",
                self.work_dir.display(),
                e
            ))
        })?;

        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                EngineError::load(format!(
                    "Failed to start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(EngineError::load(format!(
                "{} -version exited with code {:?}",
                self.binary.display(),
                output.status.code()
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            "ffmpeg engine loaded: {}",
            banner.lines().next().unwrap_or("unknown version")
        );
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_virtual_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineError::io(name, e.to_string()))
    }

    async fn execute(&self, command: &[String]) -> EngineResult<()> {
        self.ensure_loaded()?;
        if command.is_empty() {
            return Err(EngineError::execution("empty command"));
        }

        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.work_dir)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
            .args(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!("Running ffmpeg: {:?}", command);

        let output = cmd
            .output()
            .await
            .map_err(|e| EngineError::execution(format!("Failed to spawn ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::execution(format!(
                "ffmpeg exited with code {:?}: {}",
                output.status.code(),
                stderr_tail(&stderr)
            )));
        }
        Ok(())
    }

    async fn read_virtual_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::not_found(name),
            _ => EngineError::io(name, e.to_string()),
        })
    }

    async fn delete_virtual_file(&self, name: &str) -> EngineResult<()> {
        self.ensure_loaded()?;
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::not_found(name),
            _ => EngineError::io(name, e.to_string()),
        })
    }

    async fn virtual_files(&self) -> EngineResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.work_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::io(self.work_dir.display().to_string(), e.to_string())),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EngineError::io(self.work_dir.display().to_string(), e.to_string()))?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}

/// Last few non-empty lines of ffmpeg's stderr.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
