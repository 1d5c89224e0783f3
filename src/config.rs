//! Runtime configuration loaded from YAML.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error::SimError, pollution::SimulationParams};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Parameters used when a request or site does not bring its own.
    #[serde(default)]
    pub defaults: SimulationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u32,
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    /// Offline facility extract. Without one every lookup falls back.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_debounce_ms() -> u64 {
    1_000
}

fn default_cache_ttl_hours() -> u32 {
    24
}

fn default_max_cache_entries() -> usize {
    50
}

fn default_radius_m() -> f64 {
    5_000.0
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            cache_ttl_hours: default_cache_ttl_hours(),
            max_cache_entries: default_max_cache_entries(),
            radius_m: default_radius_m(),
            catalog_path: None,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_ttl_hours as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Defaults(#[from] SimError),
}

impl Config {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enrichment.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "enrichment.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.enrichment.max_cache_entries == 0 {
            return Err(ConfigError::Validation(
                "enrichment.max_cache_entries must be greater than zero".into(),
            ));
        }
        if !(self.enrichment.radius_m.is_finite() && self.enrichment.radius_m > 0.0) {
            return Err(ConfigError::Validation(
                "enrichment.radius_m must be a positive distance".into(),
            ));
        }
        self.defaults.validate()?;
        Ok(())
    }
}
