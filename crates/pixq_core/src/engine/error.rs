//! Error types for conversion engines.

use thiserror::Error;

/// Errors raised by an [`EngineHandle`](super::EngineHandle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not initialize. The message is shown to the user
    /// as-is.
    #[error("{0}")]
    Load(String),

    /// An operation was attempted before a successful `load`.
    #[error("Engine is not loaded")]
    NotLoaded,

    /// A virtual file could not be written, read or deleted.
    #[error("Virtual file '{name}': {message}")]
    Io { name: String, message: String },

    /// The command was malformed or the codec rejected the input.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl EngineError {
    /// Create a load error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// Create a virtual file I/O error.
    pub fn io(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a virtual file not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::io(name, "no such virtual file")
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
