//! Configuration management.
//!
//! Sources, in increasing precedence: embedded defaults, an optional YAML
//! configuration file, then `SENTINELA_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(#[from] serde_yaml::Error),

    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration validation failed: {message}")]
    Validation { message: String },
}

/// Main configuration structure for Sentinela components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    /// Process monitor configuration
    pub monitor: MonitorConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Process monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Polling interval in whole seconds, minimum 1
    pub interval_secs: u64,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Alert database file path
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, human)
    pub format: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/sentinela/alerts.redb"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "human".to_owned(),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader using defaults and environment overrides only.
    pub fn new() -> Self {
        Self { file: None }
    }

    /// Create a loader that also reads the given YAML file.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
        }
    }

    /// Load the configuration, applying file then environment overrides,
    /// and validate the result.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.file {
            Some(path) => Self::load_file(path)?,
            None => Config::default(),
        };

        config = Self::apply_env_overrides(config);
        Self::validate(&config)?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `SENTINELA_*` environment variable overrides. Numeric values
    /// that fail to parse leave the existing value unchanged.
    fn apply_env_overrides(mut config: Config) -> Config {
        if let Ok(val) = std::env::var("SENTINELA_INTERVAL_SECS") {
            if let Ok(interval) = val.parse() {
                config.monitor.interval_secs = interval;
            }
        }

        if let Ok(val) = std::env::var("SENTINELA_DATABASE_PATH") {
            config.database.path = val.into();
        }

        if let Ok(val) = std::env::var("SENTINELA_LOG_LEVEL") {
            config.logging.level = val;
        }

        if let Ok(val) = std::env::var("SENTINELA_LOG_FORMAT") {
            config.logging.format = val;
        }

        config
    }

    fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.monitor.interval_secs == 0 {
            return Err(ConfigError::Validation {
                message: "monitor.interval_secs must be at least 1".to_owned(),
            });
        }
        if config.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "database.path must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.interval_secs, 5);
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/sentinela/alerts.redb")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "monitor:\n  interval_secs: 30\ndatabase:\n  path: /tmp/test-alerts.redb\n",
        )
        .unwrap();

        let config = ConfigLoader::with_file(&path).load().unwrap();
        assert_eq!(config.monitor.interval_secs, 30);
        assert_eq!(config.database.path, PathBuf::from("/tmp/test-alerts.redb"));
        // Unspecified sections fall back to defaults.
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = ConfigLoader::with_file("/nonexistent/config.yaml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.monitor.interval_secs = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, deserialized);
    }
}
