//! Configuration management for the air quality service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::models::Location;
use crate::pipeline::Target;
use crate::AirQualityError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable conventionally holding the IQAir credential
pub const API_KEY_ENV_VAR: &str = "IQAIR_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AirQualityConfig {
    /// Runtime environment; `test` silences provider failure logs
    pub environment: RuntimeEnvironment,
    /// Air quality provider settings
    pub provider: ProviderConfig,
    /// Observation store settings
    pub storage: StorageConfig,
    /// Ingestion schedule and target
    pub schedule: ScheduleConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Production,
    Development,
    Test,
}

/// Air quality provider configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// IQAir API key; an absent key is sent as an empty string
    pub api_key: Option<String>,
    /// Base URL for the provider API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
}

/// Observation store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// Ingestion schedule settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between ingestion cycles
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Location ingested on every cycle
    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_provider_base_url() -> String {
    "http://api.airvisual.com/v2".to_string()
}

fn default_provider_timeout() -> u32 {
    10
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("airquality").join("observations.db"))
        .unwrap_or_else(|| PathBuf::from("observations.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_base_url(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            target: TargetConfig::default(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            city: "Paris".to_string(),
            latitude: 48.856613,
            longitude: 2.352222,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl TargetConfig {
    /// Validated ingestion target
    pub fn to_target(&self) -> crate::Result<Target> {
        let location = Location::new(self.latitude, self.longitude)?;
        Ok(Target::new(self.city.clone(), location))
    }
}

impl AirQualityConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // AIRQUALITY_PROVIDER__API_KEY, AIRQUALITY_SCHEDULE__TARGET__CITY, ...
        builder = builder.add_source(
            Environment::with_prefix("AIRQUALITY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AirQualityConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var(API_KEY_ENV_VAR)
                .ok()
                .filter(|key| !key.is_empty());
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airquality").join("config.toml"))
    }

    /// Apply default values to fields left empty by a partial config file
    pub fn apply_defaults(&mut self) {
        if self.provider.base_url.is_empty() {
            self.provider.base_url = default_provider_base_url();
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = default_provider_timeout();
        }
        if self.storage.database_path.is_empty() {
            self.storage.database_path = default_database_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.schedule
            .target
            .to_target()
            .map_err(|e| AirQualityError::config(format!("Invalid schedule target: {e}")))?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 300 {
            return Err(
                AirQualityError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.schedule.interval_seconds == 0 {
            return Err(AirQualityError::config("Schedule interval must be at least 1 second").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AirQualityError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AirQualityError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(AirQualityError::config(
                "Provider base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.schedule.target.city.trim().is_empty() {
            return Err(AirQualityError::config("Schedule target city cannot be empty").into());
        }

        Ok(())
    }
}
