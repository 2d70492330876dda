//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::TargetFormat;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Conversion defaults.
    #[serde(default)]
    pub conversion: ConversionSettings,

    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Engine selection.
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Conversion defaults applied to new batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Target format a new batch starts with.
    #[serde(default)]
    pub default_format: TargetFormat,

    /// JPEG encoder quality (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    90
}

impl ConversionSettings {
    /// JPEG quality clamped to the encoder's accepted range.
    pub fn effective_jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            default_format: TargetFormat::default(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Path configuration for outputs and engine scratch space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder converted files are saved into.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for engine working files.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,
}

fn default_output_folder() -> String {
    "converted".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Level used when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,
}

/// Which engine implementation performs conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    /// In-process decoder/encoder.
    #[default]
    Builtin,
    /// External ffmpeg binary.
    Ffmpeg,
}

impl EngineBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineBackend::Builtin => "builtin",
            EngineBackend::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(EngineBackend::Builtin),
            "ffmpeg" => Ok(EngineBackend::Ffmpeg),
            other => Err(format!("unknown engine backend '{}'", other)),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub backend: EngineBackend,

    /// ffmpeg binary, looked up on PATH unless absolute.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: EngineBackend::default(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

/// Config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Conversion,
    Paths,
    Logging,
    Engine,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Conversion,
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Engine,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Conversion => "conversion",
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Engine => "engine",
        }
    }

    /// Comment written above the table in a generated file.
    pub(crate) fn description(&self) -> &'static str {
        match self {
            ConfigSection::Conversion => "Conversion defaults",
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Engine => "Conversion engine (builtin or ffmpeg)",
        }
    }
}
