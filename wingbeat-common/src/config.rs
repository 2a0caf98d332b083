//! Configuration loading for the Wingbeat station
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. `WINGBEAT_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/wingbeat/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file path
pub const CONFIG_ENV_VAR: &str = "WINGBEAT_CONFIG";

/// Station configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Listen address for the HTTP server
    pub bind: String,
    /// SQLite database file; parent directories are created at startup
    pub database_path: PathBuf,
    pub object_store: ObjectStoreConfig,
    pub inference: InferenceConfig,
    pub encyclopedia: EncyclopediaConfig,
    pub location: LocationConfig,
}

/// Object storage endpoint and bucket
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Storage service base URL
    pub base_url: String,
    /// Bucket receiving capture uploads
    pub bucket: String,
    /// Optional API key, sent as bearer token when present
    pub api_key: Option<String>,
}

/// Species identification service endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
}

/// Encyclopedia summary endpoint for the lookup panel
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncyclopediaConfig {
    pub summary_url: String,
}

/// One-shot positioning provider endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub endpoint: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5871".to_string(),
            database_path: default_database_path(),
            object_store: ObjectStoreConfig::default(),
            inference: InferenceConfig::default(),
            encyclopedia: EncyclopediaConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321".to_string(),
            bucket: "bird-uploads".to_string(),
            api_key: None,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for EncyclopediaConfig {
    fn default() -> Self {
        Self {
            summary_url: "https://en.wikipedia.org/api/rest_v1/page/summary".to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8942/position".to_string(),
        }
    }
}

impl StationConfig {
    /// Load configuration following the priority order documented above.
    ///
    /// A path given explicitly (CLI or environment) must be readable;
    /// the platform config file is optional and silently skipped when
    /// absent.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        // Priority 1: command-line argument
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: platform config directory
        if let Some(path) = platform_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Priority 4: compiled defaults
        Ok(Self::default())
    }

    /// Parse a specific TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
    }
}

/// Platform config file location (`<config_dir>/wingbeat/config.toml`)
fn platform_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wingbeat").join("config.toml"))
}

/// Default database location (`<data_local_dir>/wingbeat/wingbeat.db`)
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wingbeat"))
        .unwrap_or_else(|| PathBuf::from("./wingbeat_data"))
        .join("wingbeat.db")
}
