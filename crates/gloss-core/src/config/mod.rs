//! Configuration management for Gloss.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults, then a handful of deployment settings can be overridden through
//! the process environment.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `store.path` (and selecting the SQLite backend).
pub const ENV_DATABASE: &str = "GLOSS_DATABASE";
/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "GLOSS_PORT";
/// Environment variable overriding `server.allowed_origin`.
pub const ENV_ALLOWED_ORIGIN: &str = "GLOSS_ALLOWED_ORIGIN";

/// Root configuration structure for Gloss.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Object store settings
    pub store: StoreConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Image-edit API settings
    pub transform: TransformConfig,

    /// Client session settings
    pub client: ClientConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply deployment overrides looked up through `lookup`.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure over a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.store.backend = StoreBackend::Sqlite;
            self.store.path = path;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("{ENV_PORT} is not a valid port: {port}"))
            })?;
        }
        if let Some(origin) = lookup(ENV_ALLOWED_ORIGIN).filter(|v| !v.is_empty()) {
            self.server.allowed_origin = origin;
        }
        self.validate()
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.gloss.gloss/config.toml
    /// - Linux: ~/.config/gloss/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\gloss\config\config.toml
    ///
    /// Falls back to ~/.gloss/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "gloss", "gloss")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".gloss").join("config.toml")
            })
    }

    /// Get the resolved SQLite database path (with ~ expansion).
    pub fn store_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.store.path);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
