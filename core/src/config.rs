//! Configuration types for Tasknest

use crate::error::StoreError;
use crate::traits::StoreResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name for logging
    pub name: String,

    /// Directory holding the durable store
    pub data_dir: PathBuf,

    /// Persistence configuration
    pub persistence: PersistenceConfig,

    /// Logging level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "tasknest".to_string(),
            data_dir: PathBuf::from("./data"),
            persistence: PersistenceConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Mirror state to the backing store at all
    pub enabled: bool,

    /// Slices eligible for durable persistence; all others are memory-only
    pub whitelist: Vec<String>,

    /// Backing store read timeout during rehydration, in milliseconds
    pub read_timeout_ms: u64,

    /// Backing store write timeout, in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist: vec![
                "tasks".to_string(),
                "theme".to_string(),
                "session".to_string(),
            ],
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl PersistenceConfig {
    /// Configuration that keeps every slice in memory only
    pub fn memory_only() -> Self {
        Self {
            enabled: false,
            whitelist: vec![],
            ..Default::default()
        }
    }

    /// Slice names that are actually persisted
    pub fn effective_whitelist(&self) -> &[String] {
        if self.enabled {
            &self.whitelist
        } else {
            &[]
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_whitelist_skips_profile() {
        let config = PersistenceConfig::default();
        assert_eq!(config.effective_whitelist(), ["tasks", "theme", "session"]);
    }

    #[test]
    fn test_disabled_persistence_has_empty_whitelist() {
        let config = PersistenceConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(config.effective_whitelist().is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AppConfig::from_json(r#"{"persistence":{"whitelist":["tasks"]}}"#).unwrap();
        assert_eq!(config.name, "tasknest");
        assert_eq!(config.persistence.whitelist, vec!["tasks".to_string()]);
        assert_eq!(config.persistence.read_timeout_ms, 5000);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasknest.json");

        let mut config = AppConfig::default();
        config.log_level = "debug".to_string();
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.log_level, "debug");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            AppConfig::from_json("{not json"),
            Err(StoreError::Config(_))
        ));
    }
}
