use crate::error::{RanaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://www.ranawaterintelligence.com";
pub const DEFAULT_THREEDI_API_URL: &str = "https://api.3di.live/v3";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for Rana
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub base_url: ConfigValue<String>,
    pub threedi_api_url: ConfigValue<String>,
    pub tenant: ConfigValue<Option<String>>,
    pub working_dir: ConfigValue<PathBuf>,
    /// Seconds between job polls
    pub job_poll_interval: ConfigValue<u64>,
    /// Seconds between publication polls
    pub publication_poll_interval: ConfigValue<u64>,
    pub max_workers: ConfigValue<usize>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            base_url: ConfigValue::new(DEFAULT_BASE_URL.to_string(), ConfigSource::Default),
            threedi_api_url: ConfigValue::new(
                DEFAULT_THREEDI_API_URL.to_string(),
                ConfigSource::Default,
            ),
            tenant: ConfigValue::new(None, ConfigSource::Default),
            working_dir: ConfigValue::new(default_working_dir(), ConfigSource::Default),
            job_poll_interval: ConfigValue::new(5, ConfigSource::Default),
            publication_poll_interval: ConfigValue::new(10, ConfigSource::Default),
            max_workers: ConfigValue::new(4, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| RanaError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| RanaError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(base_url, ConfigSource::File);
        }

        if let Some(threedi_api_url) = file_config.threedi_api_url {
            self.threedi_api_url.update(threedi_api_url, ConfigSource::File);
        }

        if let Some(tenant) = file_config.tenant {
            self.tenant.update(Some(tenant), ConfigSource::File);
        }

        if let Some(working_dir) = file_config.working_dir {
            self.working_dir.update(working_dir, ConfigSource::File);
        }

        if let Some(interval) = file_config.job_poll_interval {
            self.job_poll_interval.update(interval, ConfigSource::File);
        }

        if let Some(interval) = file_config.publication_poll_interval {
            self.publication_poll_interval.update(interval, ConfigSource::File);
        }

        if let Some(max_workers) = file_config.max_workers {
            self.max_workers.update(max_workers, ConfigSource::File);
        }

        Ok(self)
    }

    /// Like [`LayeredConfig::load_from_file`], but a missing file is not an error
    pub fn load_from_file_if_exists<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            self.load_from_file(path)
        } else {
            tracing::debug!(path = %path.as_ref().display(), "No config file, using defaults");
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(base_url) = env::var("RANA_BASE_URL") {
            self.base_url.update(base_url, ConfigSource::Environment);
        }

        if let Ok(url) = env::var("RANA_THREEDI_API_URL") {
            self.threedi_api_url.update(url, ConfigSource::Environment);
        }

        if let Ok(tenant) = env::var("RANA_TENANT") {
            self.tenant.update(Some(tenant), ConfigSource::Environment);
        }

        if let Ok(dir) = env::var("RANA_WORKING_DIR") {
            self.working_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        if let Some(interval) = parse_env_number::<u64>("RANA_JOB_POLL_INTERVAL") {
            self.job_poll_interval.update(interval, ConfigSource::Environment);
        }

        if let Some(interval) = parse_env_number::<u64>("RANA_PUBLICATION_POLL_INTERVAL") {
            self.publication_poll_interval.update(interval, ConfigSource::Environment);
        }

        if let Some(max_workers) = parse_env_number::<usize>("RANA_MAX_WORKERS") {
            self.max_workers.update(max_workers, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url.update(base_url, ConfigSource::Cli);
        }

        if let Some(tenant) = overrides.tenant {
            self.tenant.update(Some(tenant), ConfigSource::Cli);
        }

        if let Some(working_dir) = overrides.working_dir {
            self.working_dir.update(working_dir, ConfigSource::Cli);
        }
    }

    /// Rana REST API root
    pub fn api_url(&self) -> String {
        format!("{}/v1-alpha", self.base_url.value.trim_end_matches('/'))
    }

    /// Tenant, or an error naming how to set it
    pub fn require_tenant(&self) -> Result<&str> {
        self.tenant.value.as_deref().ok_or_else(|| RanaError::ConfigMissing {
            key: "tenant (set RANA_TENANT or --tenant)".to_string(),
        })
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("base_url".to_string(), (self.base_url.value.clone(), self.base_url.source));
        map.insert(
            "threedi_api_url".to_string(),
            (self.threedi_api_url.value.clone(), self.threedi_api_url.source),
        );
        map.insert(
            "tenant".to_string(),
            (self.tenant.value.clone().unwrap_or_else(|| "-".to_string()), self.tenant.source),
        );
        map.insert(
            "working_dir".to_string(),
            (self.working_dir.value.display().to_string(), self.working_dir.source),
        );
        map.insert(
            "job_poll_interval".to_string(),
            (format!("{}s", self.job_poll_interval.value), self.job_poll_interval.source),
        );
        map.insert(
            "publication_poll_interval".to_string(),
            (
                format!("{}s", self.publication_poll_interval.value),
                self.publication_poll_interval.source,
            ),
        );
        map.insert(
            "max_workers".to_string(),
            (self.max_workers.value.to_string(), self.max_workers.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    base_url: Option<String>,
    threedi_api_url: Option<String>,
    tenant: Option<String>,
    working_dir: Option<PathBuf>,
    job_poll_interval: Option<u64>,
    publication_poll_interval: Option<u64>,
    max_workers: Option<usize>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub base_url: Option<String>,
    pub tenant: Option<String>,
    pub working_dir: Option<PathBuf>,
}

/// Default location for downloaded schematisations and project files
pub fn default_working_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join("Rana")
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rana")
        .join("config.toml")
}

fn parse_env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected a non-negative integer", key, raw);
            None
        }
    }
}
