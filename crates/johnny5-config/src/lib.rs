//! # johnny5-config
//!
//! Configuration management for the johnny5 launcher.
//!
//! Loads configuration from:
//! 1. `~/.johnny5/config.toml` (global)
//! 2. `.johnny5/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)
//!
//! The preloaded shim itself never reads any of this; only the launcher does.

pub mod logging;

use logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the built shim on this platform.
#[cfg(target_os = "macos")]
pub const SHIM_FILE_NAME: &str = "libjohnny5_shim.dylib";
#[cfg(not(target_os = "macos"))]
pub const SHIM_FILE_NAME: &str = "libjohnny5_shim.so";

/// Loader variable that carries preloaded libraries on this platform.
#[cfg(target_os = "macos")]
pub const PRELOAD_ENV: &str = "DYLD_INSERT_LIBRARIES";
#[cfg(not(target_os = "macos"))]
pub const PRELOAD_ENV: &str = "LD_PRELOAD";

/// Separator between entries of [`PRELOAD_ENV`].
#[cfg(target_os = "macos")]
pub const PRELOAD_SEPARATOR: char = ':';
#[cfg(not(target_os = "macos"))]
pub const PRELOAD_SEPARATOR: char = ' ';

/// Project-local config directory, relative to the working directory.
pub const PROJECT_DIR: &str = ".johnny5";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preload: PreloadConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let project = Self::project_config_path();
        let mut config = Self::load_from(global.as_deref(), &project)?;

        // 3. Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Load and merge the global and project files, without environment overrides.
    /// Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Load global config (~/.johnny5/config.toml)
        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        // 2. Load project config (.johnny5/config.toml) - overrides global
        if project.exists() {
            debug!("Loading project config from {:?}", project);
            let contents = std::fs::read_to_string(project)?;
            let overlay: ConfigOverlay = toml::from_str(&contents)?;
            config.merge(overlay);
        }

        Ok(config)
    }

    /// Global config path: ~/.johnny5/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(PROJECT_DIR).join("config.toml"))
    }

    /// Project config path: .johnny5/config.toml
    pub fn project_config_path() -> PathBuf {
        Path::new(PROJECT_DIR).join("config.toml")
    }

    /// Merge a project overlay. Every key the overlay sets wins, even when it
    /// matches the default.
    fn merge(&mut self, overlay: ConfigOverlay) {
        if let Some(library) = overlay.preload.library {
            self.preload.library = Some(library);
        }
        if let Some(flat_namespace) = overlay.preload.flat_namespace {
            self.preload.flat_namespace = flat_namespace;
        }
        if let Some(level) = overlay.logging.level {
            self.logging.level = level;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("JOHNNY5_LIBRARY") {
            if !path.is_empty() {
                self.preload.library = Some(PathBuf::from(path));
            }
        }
        if let Ok(level) = std::env::var("JOHNNY5_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warn!("Ignoring JOHNNY5_LOG_LEVEL: {}", e),
            }
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        Config::default().to_toml()
    }

    /// Render this config as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Preload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Explicit path to the shim library (None = search)
    pub library: Option<PathBuf>,
    /// Set DYLD_FORCE_FLAT_NAMESPACE=1 alongside the insert (macOS only)
    pub flat_namespace: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            library: None,
            flat_namespace: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when JOHNNY5_LOG / RUST_LOG are unset
    pub level: LogLevel,
}

/// Project file as written: absent keys stay `None` so they do not mask the global file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    preload: PreloadOverlay,
    logging: LoggingOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PreloadOverlay {
    library: Option<PathBuf>,
    flat_namespace: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingOverlay {
    level: Option<LogLevel>,
}
