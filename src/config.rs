//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::{CoercionTable, QueryExecutor};
use crate::storage::{FlatStore, StorageResult, StoreConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_output_delimiter")]
    pub output_delimiter: String,

    /// Field name to coercion strategy used by aggregates
    #[serde(default)]
    pub coercions: CoercionTable,
}

fn default_output_delimiter() -> String {
    "|".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            output_delimiter: default_output_delimiter(),
            coercions: CoercionTable::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("flatstore").join("config.toml")),
            Some(PathBuf::from("./flatstore.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("FLATSTORE_DATA_DIR") {
            self.store.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(delimiter) = std::env::var("FLATSTORE_OUTPUT_DELIMITER") {
            self.query.output_delimiter = delimiter;
        }
        if let Ok(level) = std::env::var("FLATSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FLATSTORE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Open the configured store
    pub fn open_store(&self) -> StorageResult<FlatStore> {
        FlatStore::new(self.store.clone())
    }

    /// Open the configured store wrapped in a query executor
    pub fn executor(&self) -> StorageResult<QueryExecutor> {
        Ok(QueryExecutor::new(self.open_store()?)
            .with_coercions(self.query.coercions.clone())
            .with_output_delimiter(self.query.output_delimiter.clone()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Flatstore Configuration
#
# Environment variables override these settings:
# - FLATSTORE_DATA_DIR
# - FLATSTORE_OUTPUT_DELIMITER
# - FLATSTORE_LOG_LEVEL
# - FLATSTORE_LOG_FORMAT

[store]
# Directory holding the schema file and record hierarchy
data_dir = "./data"

# Schema file name inside data_dir
headers_file = "headers.csv"

# Field delimiters for import files and stored records
input_delimiter = "|"
store_delimiter = "|"

# Fields forming the {partition}/{date}/{item} path of each record
[store.key_fields]
partition = "STB"
date = "DATE"
item = "TITLE"

[query]
# Delimiter between report columns
output_delimiter = "|"

# How aggregates interpret fields: text, decimal, or duration (H:MM)
[query.coercions]
REV = "decimal"
VIEW_TIME = "duration"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
