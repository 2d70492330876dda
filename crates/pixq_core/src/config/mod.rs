//! Configuration management for pixq.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use pixq_core::config::{ConfigManager, ConfigSection};
//! use pixq_core::models::TargetFormat;
//!
//! let mut config = ConfigManager::new(".config/pixq.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().conversion.default_format = TargetFormat::Webp;
//! config.update_section(ConfigSection::Conversion).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ConversionSettings, EngineBackend, EngineSettings, LoggingSettings,
    PathSettings, Settings,
};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/pixq.toml";
