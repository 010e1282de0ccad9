//! # Configuration
//!
//! Layered configuration: compiled defaults, then an optional TOML file,
//! then `BUILDRISK_*` environment overrides. Loaded configuration is
//! validated before use; thresholds like the async row threshold and the
//! sync byte ceiling live here and are never hardcoded at call sites.

use crate::constants::{
    DEFAULT_ARTIFACT_DIR, DEFAULT_ASYNC_THRESHOLD_ROWS, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_PAGE_LIMIT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SYNC_BYTE_CEILING, MAX_PAGE_LIMIT,
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration load and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Export orchestration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Row count above which a job is recommended over a sync stream
    pub async_threshold_rows: u64,
    /// Hard ceiling on a synchronous export payload, in bytes
    pub sync_byte_ceiling: u64,
    /// Fixed job polling interval, in milliseconds
    pub poll_interval_ms: u64,
    /// Directory for retained export artifacts
    pub artifact_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            async_threshold_rows: DEFAULT_ASYNC_THRESHOLD_ROWS,
            sync_byte_ceiling: DEFAULT_SYNC_BYTE_CEILING,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            artifact_dir: DEFAULT_ARTIFACT_DIR.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Delta channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slower subscribers lag past this
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// List pagination bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Root configuration for the BuildRisk core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildriskConfig {
    pub export: ExportConfig,
    pub events: EventsConfig,
    pub pagination: PaginationConfig,
}

impl BuildriskConfig {
    /// Load with the default file location (`buildrisk.toml` in the working
    /// directory, optional) honoring `BUILDRISK_CONFIG` as an override path
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BUILDRISK_CONFIG").ok();
        Self::load_from(path.as_deref())
    }

    /// Load defaults, then the given TOML file (required when named), then
    /// `BUILDRISK_*` environment overrides; validate the result
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&Self::default())?);

        builder = match path {
            Some(p) => builder.add_source(File::new(p, FileFormat::Toml).required(true)),
            None => builder.add_source(File::new("buildrisk", FileFormat::Toml).required(false)),
        };

        let loaded: Self = builder
            .add_source(Environment::with_prefix("BUILDRISK").separator("__"))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export.sync_byte_ceiling == 0 {
            return Err(ConfigError::Invalid {
                field: "export.sync_byte_ceiling",
                reason: "must be greater than zero".into(),
            });
        }
        if self.export.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "export.poll_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.export.artifact_dir.is_empty() {
            return Err(ConfigError::Invalid {
                field: "export.artifact_dir",
                reason: "must not be empty".into(),
            });
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "events.channel_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::Invalid {
                field: "pagination.default_limit",
                reason: format!(
                    "must be between 1 and max_limit ({})",
                    self.pagination.max_limit
                ),
            });
        }
        Ok(())
    }
}
