//! In-process engine backed by the `image` crate.
//!
//! Virtual files live in memory. Decoding guesses the input format from
//! its bytes; encoding picks the format from the output name's extension.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use parking_lot::Mutex;

use super::command::{extension_of, parse_transcode_command, validate_virtual_name};
use super::error::{EngineError, EngineResult};
use super::EngineHandle;
use crate::models::TargetFormat;

/// Default JPEG quality when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Engine that decodes and encodes in-process.
pub struct BuiltinEngine {
    /// Virtual filesystem.
    files: Mutex<HashMap<String, Arc<[u8]>>>,
    /// Set once `load` succeeds.
    loaded: AtomicBool,
    /// JPEG encoder quality (1..=100).
    jpeg_quality: u8,
}

impl BuiltinEngine {
    /// Create an unloaded engine with the default JPEG quality.
    pub fn new() -> Self {
        Self::with_jpeg_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create an unloaded engine with a JPEG quality, clamped to 1..=100.
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            loaded: AtomicBool::new(false),
            jpeg_quality: quality.clamp(1, 100),
        }
    }

    fn ensure_loaded(&self) -> EngineResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineHandle for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn load(&self) -> EngineResult<()> {
        self.loaded.store(true, Ordering::SeqCst);
        tracing::debug!("Builtin engine loaded (jpeg quality {})", self.jpeg_quality);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_virtual_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        self.ensure_loaded()?;
        validate_virtual_name(name)?;
        self.files.lock().insert(name.to_string(), Arc::from(bytes));
        Ok(())
    }

    async fn execute(&self, command: &[String]) -> EngineResult<()> {
        self.ensure_loaded()?;
        let (input, output) = parse_transcode_command(command)?;
        validate_virtual_name(output)?;

        let format = extension_of(output)
            .and_then(TargetFormat::from_extension)
            .ok_or_else(|| {
                EngineError::execution(format!("cannot infer output format from '{}'", output))
            })?;

        let bytes = self
            .files
            .lock()
            .get(input)
            .cloned()
            .ok_or_else(|| EngineError::execution(format!("input '{}' does not exist", input)))?;

        let quality = self.jpeg_quality;
        let encoded = tokio::task::spawn_blocking(move || transcode(&bytes, format, quality))
            .await
            .map_err(|e| EngineError::execution(format!("codec task failed: {}", e)))??;

        tracing::trace!("Builtin engine wrote {} ({} bytes)", output, encoded.len());
        self.files.lock().insert(output.to_string(), Arc::from(encoded));
        Ok(())
    }

    async fn read_virtual_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        self.ensure_loaded()?;
        self.files
            .lock()
            .get(name)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| EngineError::not_found(name))
    }

    async fn delete_virtual_file(&self, name: &str) -> EngineResult<()> {
        self.ensure_loaded()?;
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(name))
    }

    async fn virtual_files(&self) -> EngineResult<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Decode `bytes` and re-encode them as `format`.
fn transcode(bytes: &[u8], format: TargetFormat, jpeg_quality: u8) -> EngineResult<Vec<u8>> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| EngineError::execution(format!("decode failed: {}", e)))?;
    encode(&image, format, jpeg_quality)
        .map_err(|e| EngineError::execution(format!("{} encode failed: {}", format, e)))
}

fn encode(
    image: &DynamicImage,
    format: TargetFormat,
    jpeg_quality: u8,
) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        TargetFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buffer))?,
        // JPEG has no alpha channel
        TargetFormat::Jpeg => image
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, jpeg_quality))?,
        TargetFormat::Webp => image
            .to_rgba8()
            .write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?,
    }
    Ok(buffer)
}
