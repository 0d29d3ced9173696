//! Configuration loading.
//!
//! Configuration is read from a TOML file; every field has a default, so an
//! empty file (or `Config::default()`) points at the public API with a
//! `favorites.sqlite3` database in the working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::client::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::pagination::DEFAULT_MAX_PAGES;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint root; `/character` is appended for the listing.
    pub base_url: String,
    /// Cap on pages followed in one load.
    pub max_pages: usize,
    /// Whole-request timeout in seconds. Unset leaves the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Favorites persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub on_failure: StorageFailurePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("favorites.sqlite3"),
            on_failure: StorageFailurePolicy::default(),
        }
    }
}

/// What the repository does when the favorites store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFailurePolicy {
    /// Log a warning and degrade: no favorites, toggles become no-ops.
    #[default]
    Ignore,
    /// Return the `StorageError` to the caller.
    Propagate,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".to_string()));
        }
        Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Invalid(format!("api.base_url {:?} is not a URL: {e}", self.api.base_url))
        })?;
        if self.api.max_pages == 0 {
            return Err(ConfigError::Invalid("api.max_pages must be at least 1".to_string()));
        }
        Ok(())
    }
}
