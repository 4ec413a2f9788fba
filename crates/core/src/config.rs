//! Configuration management
//!
//! Configuration is read from `config.toml` in the duck configuration
//! directory and handed to sessions and clients explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "DUCK_CONFIG_DIR";

const SCHEMA_VERSION: u32 = 1;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub b2: B2Config,

    /// Directory holding `*.duckprofile` protocol profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            listing: ListingConfig::default(),
            retry: RetryConfig::default(),
            b2: B2Config::default(),
            profiles_dir: None,
        }
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Listing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Items requested per page
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> u32 {
    1000
}

/// Retry policy of transport clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10000
}

/// Backblaze B2 settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct B2Config {
    /// Bucket type for new buckets when no region is given
    #[serde(default = "default_bucket_type")]
    pub bucket_type: String,
}

impl Default for B2Config {
    fn default() -> Self {
        Self {
            bucket_type: default_bucket_type(),
        }
    }
}

fn default_bucket_type() -> String {
    "allPrivate".to_string()
}

/// Loads and saves [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `$DUCK_CONFIG_DIR/config.toml`, falling back to the platform
    /// configuration directory.
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("No configuration directory".to_string()))?
                .join("duck"),
        };
        Ok(Self::with_path(dir.join("config.toml")))
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration. A missing file yields the defaults.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;
        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Unsupported schema version {} (expected at most {SCHEMA_VERSION})",
                config.schema_version
            )));
        }
        if config.listing.chunk_size == 0 {
            return Err(Error::Config("listing.chunk_size must be positive".to_string()));
        }
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}
