//! Application configuration
//!
//! This module re-exports the shared config types from cellmap-types and
//! provides the platform default and persistence for AppConfig.

use std::path::{Path, PathBuf};

pub use cellmap_types::{AppConfig, EngineConfig};

use super::ConfigError;

const APP_NAME: &str = "cellmap";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_documents_directory() -> String {
    dirs::data_dir()
        .map(|p| p.join(APP_NAME).join("documents"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    fn load() -> Self;
    fn load_with_defaults() -> Self;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    fn set_documents_directory(&mut self, path: &Path) -> Result<(), ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        match Self::config_path() {
            Ok(path) => load_from(&path),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to locate configuration, using defaults");
                Self::load_with_defaults()
            }
        }
    }

    /// Load with platform-specific defaults (used when no config file exists)
    fn load_with_defaults() -> Self {
        AppConfig::with_documents_directory(default_documents_directory())
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Path)
    }

    fn set_documents_directory(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        self.documents_directory = path.to_string_lossy().into_owned();
        Ok(())
    }
}

/// Load the config stored at `path`. A missing file is created from the
/// platform defaults rather than from `AppConfig::default()`.
fn load_from(path: &Path) -> AppConfig {
    if !path.exists() {
        let config = AppConfig::load_with_defaults();
        if let Err(e) = confy::store_path(path, &config) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write default configuration");
        }
        return config;
    }

    match confy::load_path(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Failed to load configuration, using defaults");
            AppConfig::load_with_defaults()
        }
    }
}
