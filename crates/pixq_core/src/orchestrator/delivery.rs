//! Handing finished outputs to the user.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::OutputPayload;

/// Errors raised while delivering an output.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// Create an I/O error with the path involved.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Destination for downloaded outputs.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver one payload under the suggested filename.
    async fn deliver(&self, filename: &str, payload: &OutputPayload) -> Result<(), DeliveryError>;
}

/// Outcome of a download-all pass.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Filenames delivered, in batch order.
    pub delivered: Vec<String>,
    /// Filenames that could not be delivered, with the reason.
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes outputs into a directory.
///
/// An existing file is never overwritten: the name gets a ` (n)` suffix
/// instead, the way a browser download folder behaves.
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn unique_path(&self, filename: &str) -> PathBuf {
        let candidate = self.dir.join(filename);
        if !path_exists(&candidate).await {
            return candidate;
        }

        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        let mut n = 1;
        loop {
            let name = match ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let path = self.dir.join(name);
            if !path_exists(&path).await {
                return path;
            }
            n += 1;
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[async_trait]
impl DeliverySink for DirectoryDelivery {
    async fn deliver(&self, filename: &str, payload: &OutputPayload) -> Result<(), DeliveryError> {
        if filename.contains('/') || filename.contains('\\') {
            return Err(DeliveryError::Rejected(format!(
                "filename '{}' contains a path separator",
                filename
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DeliveryError::io(&self.dir, e))?;

        let path = self.unique_path(filename).await;
        tokio::fs::write(&path, payload.bytes())
            .await
            .map_err(|e| DeliveryError::io(&path, e))?;

        tracing::info!("Saved {} ({} bytes)", path.display(), payload.len());
        Ok(())
    }
}
