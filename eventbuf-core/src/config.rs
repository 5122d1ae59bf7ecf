//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/eventbuf/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/eventbuf/` (~/.config/eventbuf/)
//! - Data: `$XDG_DATA_HOME/eventbuf/` (~/.local/share/eventbuf/)
//! - State/Logs: `$XDG_STATE_HOME/eventbuf/` (~/.local/state/eventbuf/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cooldown between the end of one send attempt and the next queue check
pub const DEFAULT_COOLDOWN_SECS: f64 = 2.0;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Collector endpoint and dispatch timing
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Collector configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// Endpoint URL events are POSTed to (required)
    pub endpoint: Option<String>,

    /// Seconds between send attempts
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,

    /// HTTP client timeout; unset leaves it to the transport
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// How long shutdown waits for an in-flight send before abandoning it
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            cooldown_secs: default_cooldown_secs(),
            timeout_secs: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_cooldown_secs() -> f64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl CollectorConfig {
    /// Config pointing at `endpoint` with default timings
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    /// Check if an endpoint is configured
    pub fn is_ready(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Config("collector.endpoint is required".to_string()))?;

        reqwest::Url::parse(endpoint).map_err(|e| {
            Error::Config(format!("collector.endpoint is not a valid URL: {}", e))
        })?;

        if !self.cooldown_secs.is_finite() || self.cooldown_secs <= 0.0 {
            return Err(Error::Config(
                "collector.cooldown_secs must be a positive number".to_string(),
            ));
        }
        Duration::try_from_secs_f64(self.cooldown_secs).map_err(|_| {
            Error::Config(format!(
                "collector.cooldown_secs is out of range: {}",
                self.cooldown_secs
            ))
        })?;
        Ok(())
    }

    /// The validated endpoint
    pub fn endpoint(&self) -> Result<&str> {
        self.validate()?;
        self.endpoint
            .as_deref()
            .ok_or_else(|| Error::Config("collector.endpoint is required".to_string()))
    }

    /// Cooldown as a `Duration`; falls back to the default when out of range
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_COOLDOWN_SECS))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Snapshot storage configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Override for the SQLite store path
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Store path, honoring `storage.path`
    pub fn store_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(Self::default_store_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/eventbuf/config.toml` (~/.config/eventbuf/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("eventbuf").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/eventbuf/` (~/.local/share/eventbuf/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("eventbuf")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/eventbuf/` (~/.local/state/eventbuf/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("eventbuf")
    }

    /// Returns the default store file path
    ///
    /// `$XDG_DATA_HOME/eventbuf/store.db` (~/.local/share/eventbuf/store.db)
    pub fn default_store_path() -> PathBuf {
        Self::data_dir().join("store.db")
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.collector.endpoint.is_none());
        assert_eq!(config.collector.cooldown_secs, 2.0);
        assert_eq!(config.collector.cooldown(), Duration::from_secs(2));
        assert!(config.collector.timeout().is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.collector.is_ready());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[collector]
endpoint = "https://collector.example.com/events"
cooldown_secs = 0.5
timeout_secs = 10

[storage]
path = "/tmp/eventbuf-test.db"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.collector.endpoint.as_deref(),
            Some("https://collector.example.com/events")
        );
        assert_eq!(config.collector.cooldown(), Duration::from_millis(500));
        assert_eq!(config.collector.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.collector.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.store_path(), PathBuf::from("/tmp/eventbuf-test.db"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.collector.validate().is_ok());
    }

    #[test]
    fn test_collector_config_validation() {
        // Missing endpoint
        let config = CollectorConfig::default();
        assert!(config.validate().is_err());

        // Not a URL
        let config = CollectorConfig::with_endpoint("collector.example.com");
        assert!(config.validate().is_err());

        // Non-positive cooldown
        let config = CollectorConfig {
            cooldown_secs: 0.0,
            ..CollectorConfig::with_endpoint("http://localhost:8080/events")
        };
        assert!(config.validate().is_err());

        let config = CollectorConfig {
            cooldown_secs: f64::NAN,
            ..CollectorConfig::with_endpoint("http://localhost:8080/events")
        };
        assert!(config.validate().is_err());

        // Finite but too large for a Duration
        let config = CollectorConfig {
            cooldown_secs: 1e30,
            ..CollectorConfig::with_endpoint("http://localhost:8080/events")
        };
        assert!(config.validate().is_err());
        assert!(config.endpoint().is_err());
        assert_eq!(config.cooldown(), Duration::from_secs(2));

        let config = CollectorConfig::with_endpoint("http://localhost:8080/events");
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint().unwrap(), "http://localhost:8080/events");
    }

    #[test]
    fn test_paths() {
        assert!(Config::config_path().ends_with("eventbuf/config.toml"));
        assert!(Config::default_store_path().ends_with("eventbuf/store.db"));
        assert!(Config::state_dir().ends_with("eventbuf"));
    }
}
