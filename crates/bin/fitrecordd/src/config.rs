//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fitrecord.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;

use fitrecord_adapter_ble::BleConfig;
use fitrecord_domain::sensor::SensorConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Bluetooth adapter settings.
    pub ble: BleConfig,
    /// Recording session settings.
    pub session: SessionConfig,
    /// Sensors activated by `record`.
    pub sensors: Vec<SensorConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Recording session configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Use the simulated peripherals and location instead of Bluetooth.
    pub virtual_devices: bool,
}

impl Config {
    /// Load configuration from `fitrecord.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// sensor list is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fitrecord.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FITRECORD_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("FITRECORD_VIRTUAL")
            && let Some(enabled) = parse_flag(&val)
        {
            self.session.virtual_devices = enabled;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.id.as_str().trim().is_empty() {
                return Err(ConfigError::Validation(
                    "sensor id must not be empty".to_string(),
                ));
            }
            if !seen.insert(&sensor.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate sensor id {}",
                    sensor.id
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fitrecordd=info,fitrecord=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
