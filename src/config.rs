//! Configuration file support for the preloader.
//!
//! Settings are stored as versioned JSON. Missing fields fall back to their
//! defaults so older files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TEXTURE_PACK_MARKER, DEFAULT_WORKER_THREADS};
use crate::search_path::SearchPathLayout;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Preloader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Preload assets at all
    #[serde(default = "default_true")]
    pub preload_assets: bool,

    /// Wait until assets are first needed instead of loading at startup
    #[serde(default)]
    pub defer_preload_assets: bool,

    /// Skip preloading for this run (set from the command line)
    #[serde(default, skip_serializing)]
    pub skip_preload: bool,

    /// Never preload, regardless of other settings
    #[serde(default)]
    pub force_skip_preload: bool,

    /// Emit `preload:` diagnostics and phase timings
    #[serde(default)]
    pub debug_preload: bool,

    /// Threads in the worker pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Substring that marks texture pack search paths
    #[serde(default = "default_texture_pack_marker")]
    pub texture_pack_marker: String,

    /// Directory containing the marker that is not a texture pack
    #[serde(default)]
    pub excluded_pack_dir: Option<PathBuf>,

    /// The application's own resource directory
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_worker_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

fn default_texture_pack_marker() -> String {
    DEFAULT_TEXTURE_PACK_MARKER.to_string()
}

impl PreloadConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preload_assets: true,
            defer_preload_assets: false,
            skip_preload: false,
            force_skip_preload: false,
            debug_preload: false,
            worker_threads: default_worker_threads(),
            log_level: LogLevel::default(),
            texture_pack_marker: default_texture_pack_marker(),
            excluded_pack_dir: None,
            resource_dir: None,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "atlas-preload.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("atlas-preload").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("atlas-preload")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Search path layout described by this configuration.
    pub fn layout(&self, archive_root: Option<String>) -> SearchPathLayout {
        SearchPathLayout {
            resource_dir: self.resource_dir.clone(),
            texture_pack_marker: self.texture_pack_marker.clone(),
            excluded_pack_dir: self.excluded_pack_dir.clone(),
            archive_root,
        }
    }

    /// Whether preloading is disabled outright.
    pub fn forced_skip_preload(&self) -> bool {
        !self.preload_assets || self.skip_preload || self.force_skip_preload
    }

    /// Whether a preload should be attempted now.
    ///
    /// `on_loading` is true during startup, where deferred preloading waits.
    pub fn should_try_to_preload(&self, on_loading: bool, already_preloaded: bool) -> bool {
        if self.forced_skip_preload() || already_preloaded {
            return false;
        }

        if on_loading {
            return !self.defer_preload_assets;
        }

        true
    }
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading the config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
