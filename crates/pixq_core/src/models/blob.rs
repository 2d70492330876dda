//! Input payloads handed to the orchestrator.

use std::sync::Arc;

/// Immutable binary payload with a display name.
///
/// Produced by whatever acquires input (files, URLs, stdin). Bytes are
/// reference-counted so the engine worker can read them without copying.
#[derive(Debug, Clone)]
pub struct InputBlob {
    name: String,
    bytes: Arc<[u8]>,
}

impl InputBlob {
    /// Create a blob from a display name and its bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Display name (usually the original filename).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Name with its last extension stripped.
    ///
    /// `photo.HEIC.jpg` becomes `photo.HEIC`. Names without an extension,
    /// and dotfiles like `.hidden`, are returned unchanged.
    pub fn base_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((base, _)) if !base.is_empty() => base,
            _ => &self.name,
        }
    }
}
