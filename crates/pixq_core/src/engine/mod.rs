//! Conversion engines.
//!
//! An engine is a shared, stateful capability with a private virtual
//! filesystem: bytes go in under a name, a transcode command runs against
//! those names, and the produced bytes come back out under another name.
//! Engines are loaded once per process and are never driven by more than
//! one conversion at a time (see `orchestrator::EngineWorker`).
//!
//! ```text
//! write_virtual_file("input_0_a.jpg")
//!     -> execute(["-i", "input_0_a.jpg", "output_0.png"])
//!     -> read_virtual_file("output_0.png")
//!     -> delete_virtual_file(..)
//! ```

mod builtin;
mod command;
mod error;
mod ffmpeg;

pub use builtin::BuiltinEngine;
pub use command::{
    extension_of, parse_transcode_command, transcode_command, validate_virtual_name, INPUT_FLAG,
};
pub use error::{EngineError, EngineResult};
pub use ffmpeg::FfmpegEngine;

use async_trait::async_trait;

/// Contract every conversion engine implements.
///
/// All methods take `&self`; engines keep their virtual filesystem behind
/// interior mutability so a single `Arc<dyn EngineHandle>` can be shared
/// process-wide.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Short engine name (for logging).
    fn name(&self) -> &str;

    /// Initialize the engine. Fails with [`EngineError::Load`].
    async fn load(&self) -> EngineResult<()>;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Store bytes under a virtual name, replacing any previous entry.
    async fn write_virtual_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()>;

    /// Run a transcode command against virtual files.
    async fn execute(&self, command: &[String]) -> EngineResult<()>;

    /// Fetch the bytes stored under a virtual name.
    async fn read_virtual_file(&self, name: &str) -> EngineResult<Vec<u8>>;

    /// Remove a virtual file. Fails if the name is absent.
    async fn delete_virtual_file(&self, name: &str) -> EngineResult<()>;

    /// Names currently present in the virtual filesystem, sorted.
    async fn virtual_files(&self) -> EngineResult<Vec<String>>;
}
