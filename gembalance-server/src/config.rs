//! Server configuration.
//!
//! Loaded from a JSON file (`gembalance.json` in the working directory, or
//! the path in `GEMBALANCE_CONFIG`). A missing file means defaults; a file
//! that exists but fails to read or parse is an error, so a typo never
//! silently launches an unconfigured server.

use gembalance_types::{ConfigError, ModelCategory, QuotaSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "GEMBALANCE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "gembalance.json";

const fn default_port() -> u16 {
    8046
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_interval_minutes() -> u64 {
    30
}

const fn default_enabled() -> bool {
    true
}

const fn default_failover_attempts() -> usize {
    gembalance_core::DEFAULT_FAILOVER_ATTEMPTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file path; `None` runs on the in-memory store.
    pub database_path: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
    /// Representative model per category for health probes.
    pub probe_models: Vec<ProbeTarget>,
    pub failover_attempts: usize,
    /// Initial quota settings; editable at runtime through the API.
    pub quota: QuotaSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub category: ModelCategory,
    pub model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            scheduler: SchedulerConfig::default(),
            probe_models: default_probe_models(),
            failover_attempts: default_failover_attempts(),
            quota: QuotaSettings::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), interval_minutes: default_interval_minutes() }
    }
}

fn default_probe_models() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget { category: ModelCategory::Pro, model: "gemini-2.5-pro".to_string() },
        ProbeTarget { category: ModelCategory::Flash, model: "gemini-2.5-flash".to_string() },
    ]
}

impl ServerConfig {
    /// Load from `GEMBALANCE_CONFIG` or the default path.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { message: format!("{}: {e}", path.display()) })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse { message: format!("{}: {e}", path.display()) })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.failover_attempts == 0 {
            return Err(ConfigError::InvalidQuota {
                field: "failover_attempts".to_string(),
                value: 0,
            });
        }
        // A zero period would panic inside the sweep task's interval timer.
        if self.scheduler.interval_minutes == 0 {
            return Err(ConfigError::InvalidQuota {
                field: "scheduler.interval_minutes".to_string(),
                value: 0,
            });
        }
        if self.probe_models.is_empty() {
            return Err(ConfigError::Parse {
                message: "probe_models must name at least one model".to_string(),
            });
        }
        Ok(())
    }

    /// Probe targets in the shape the pool's prober takes.
    pub fn probe_targets(&self) -> Vec<(ModelCategory, String)> {
        self.probe_models.iter().map(|t| (t.category, t.model.clone())).collect()
    }

    /// Model used to gate key eligibility for upstream model listing.
    pub fn listing_gate_model(&self) -> &str {
        self.probe_models
            .iter()
            .find(|t| t.category == ModelCategory::Flash)
            .or_else(|| self.probe_models.first())
            .map_or("gemini-2.5-flash", |t| t.model.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ServerConfig::load_from(Path::new("/nonexistent/gembalance.json")).unwrap();
        assert_eq!(config.port, 8046);
        assert!(config.scheduler.enabled);
        assert_eq!(config.failover_attempts, 3);
        assert_eq!(config.probe_models.len(), 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gembalance.json");
        std::fs::write(&path, r#"{"port": 9000, "scheduler": {"interval_minutes": 5}}"#).unwrap();

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.scheduler.interval_minutes, 5);
        assert!(config.scheduler.enabled);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gembalance.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ServerConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_failover_attempts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gembalance.json");
        std::fs::write(&path, r#"{"failover_attempts": 0}"#).unwrap();
        assert!(ServerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_zero_scheduler_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gembalance.json");
        std::fs::write(&path, r#"{"scheduler": {"interval_minutes": 0}}"#).unwrap();
        assert!(matches!(
            ServerConfig::load_from(&path),
            Err(ConfigError::InvalidQuota { .. })
        ));
    }

    #[test]
    fn test_listing_gate_prefers_flash_probe() {
        let config = ServerConfig::default();
        assert_eq!(config.listing_gate_model(), "gemini-2.5-flash");
    }
}
