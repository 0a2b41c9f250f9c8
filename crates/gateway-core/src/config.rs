//! Static service configuration: listen address, data directory, and
//! retention windows. Loaded from TOML, falling back to defaults when the
//! file is absent. Settings that change at runtime (budgets, quotas) use
//! a separate JSON-backed config instead; see `gateway-admission`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub adapters: AdapterSourcesConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            retention: RetentionConfig::default(),
            scheduler: SchedulerConfig::default(),
            adapters: AdapterSourcesConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `~/.gateway/config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn default_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".gateway").join("config.toml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8787
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> String {
    "~/.gateway/data".into()
}

/// Matches spec.md §4.5's pruning defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub metric_retention_days: i64,
    #[serde(default = "default_inactivity_days")]
    pub model_inactivity_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { metric_retention_days: default_retention_days(), model_inactivity_days: default_inactivity_days() }
    }
}

fn default_retention_days() -> i64 {
    30
}
fn default_inactivity_days() -> i64 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_prune_interval_minutes")]
    pub prune_interval_minutes: u32,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { prune_interval_minutes: default_prune_interval_minutes(), worker_pool_size: default_worker_pool_size() }
    }
}

fn default_prune_interval_minutes() -> u32 {
    60
}
fn default_worker_pool_size() -> usize {
    4
}

/// Outbound URLs for the benchmark-adapter sources. Each defaults to `None`,
/// meaning that source is disabled — its adapter reports `DataUnavailable`
/// on every scheduled tick instead of making a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterSourcesConfig {
    pub pricing_url: Option<String>,
    pub arena_url: Option<String>,
    pub leaderboard_url: Option<String>,
    pub local_inference_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_retention_windows() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.retention.metric_retention_days, 30);
        assert_eq!(cfg.retention.model_inactivity_days, 90);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = ServiceConfig::default();
        let text = cfg.to_toml().unwrap();
        let back: ServiceConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.server.port, cfg.server.port);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.toml");
        let err = ServiceConfig::load_from(missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
