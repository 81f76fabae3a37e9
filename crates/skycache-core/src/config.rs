use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SKYCACHE_CONFIG";
/// Environment variable overriding `provider.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable overriding `database.path`.
pub const DATABASE_PATH_ENV: &str = "SKYCACHE_DATABASE_PATH";
/// Environment variable overriding `server.bind_addr`.
pub const BIND_ADDR_ENV: &str = "SKYCACHE_BIND_ADDR";

const DEFAULT_PROVIDER_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store connection target (SQLite database file)
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API key
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the current-weather API
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Request timeout. Unset means the HTTP client default (no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Collapse concurrent refreshes of the same city into one provider call
    #[serde(default = "default_dedupe_inflight")]
    pub dedupe_inflight: bool,
}

fn default_dedupe_inflight() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dedupe_inflight: default_dedupe_inflight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load configuration from file (if present) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            Self::from_toml_str(&contents)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate an already loaded configuration.
    ///
    /// A missing required setting fails with `ConfigError::MissingSetting`
    /// before the remaining checks run.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        self.require_settings()?;
        let validation = self.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Empty values are ignored so a blank variable never clears a file setting.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.provider.api_key = key;
        }
        if let Some(path) = non_empty(DATABASE_PATH_ENV) {
            self.database.path = path;
        }
        if let Some(addr) = non_empty(BIND_ADDR_ENV) {
            self.server.bind_addr = addr;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.database.path.trim().is_empty() {
            result.add_error(
                "database.path",
                format!("Store connection target is required (set {})", DATABASE_PATH_ENV),
            );
        }

        if self.provider.api_key.trim().is_empty() {
            result.add_error(
                "provider.api_key",
                format!("Weather provider API key is required (set {})", API_KEY_ENV),
            );
        }

        self.validate_url(&self.provider.base_url, "provider.base_url", &mut result);

        if self.provider.timeout_secs == Some(0) {
            result.add_warning(
                "provider.timeout_secs",
                "Timeout of 0 seconds; requests will fail immediately",
            );
        }

        if let Err(e) = self.server.bind_addr.parse::<SocketAddr>() {
            result.add_error("server.bind_addr", format!("Invalid socket address: {}", e));
        }

        result
    }

    /// Fail with a typed error if a required setting is missing.
    pub fn require_settings(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::missing("database.path"));
        }
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigError::missing("provider.api_key"));
        }
        Ok(())
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(explicit));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycache");

        Ok(config_dir.join("config.toml"))
    }
}
