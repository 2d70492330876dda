//! Building and loading the configured engine.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use pixq_core::config::{EngineBackend, Settings};
use pixq_core::engine::{BuiltinEngine, EngineHandle, FfmpegEngine};

use crate::cli::{CliError, CliResult};

/// Subdirectory of the temp root used as the ffmpeg engine's filesystem.
const ENGINE_WORK_DIR: &str = "engine";

pub(crate) fn build_engine(settings: &Settings, backend: EngineBackend) -> Arc<dyn EngineHandle> {
    match backend {
        EngineBackend::Builtin => Arc::new(BuiltinEngine::with_jpeg_quality(
            settings.conversion.effective_jpeg_quality(),
        )),
        EngineBackend::Ffmpeg => Arc::new(FfmpegEngine::new(
            &settings.engine.ffmpeg_path,
            PathBuf::from(&settings.paths.temp_root).join(ENGINE_WORK_DIR),
        )),
    }
}

/// Load the engine, offering a manual retry on interactive terminals.
///
/// The load error is shown verbatim each time it fails.
pub(crate) async fn load_engine(engine: &dyn EngineHandle, interactive: bool) -> CliResult<()> {
    loop {
        tracing::info!("Loading {} engine", engine.name());
        let err = match engine.load().await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        eprintln!("error: {err}");
        if !interactive || !prompt_retry().await? {
            return Err(CliError::failure(
                anyhow::Error::new(err).context(format!("{} engine failed to load", engine.name())),
            ));
        }
    }
}

async fn prompt_retry() -> CliResult<bool> {
    tokio::task::spawn_blocking(|| {
        let stdin = io::stdin();
        let mut stderr = io::stderr();
        confirm("Retry loading the engine? [y/N] ", &mut stdin.lock(), &mut stderr)
    })
    .await
    .map_err(|err| CliError::failure(anyhow!("prompt task failed: {err}")))?
    .map_err(|err| CliError::failure(anyhow!("failed to read answer: {err}")))
}

/// Ask a yes/no question; anything but `y`/`yes` (or end of input) is no.
pub(crate) fn confirm(
    question: &str,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> io::Result<bool> {
    write!(writer, "{question}")?;
    writer.flush()?;

    let mut answer = String::new();
    if reader.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
