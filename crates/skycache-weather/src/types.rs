//! Weather data model and error types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skycache_core::{AppError, ConfigError, DatabaseError, NetworkError};

/// Placeholder used when the provider omits a condition description.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// A freshly observed reading, already in metric units
/// (Celsius, meters/second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub description: String,
    pub humidity: i32,
    pub wind_speed: f64,
}

/// Outcome of a successful provider round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Reading(Reading),
    /// The provider does not know the requested city.
    NotFound,
}

/// Cached weather for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    /// Store-assigned key; `None` until the record is first persisted.
    pub id: Option<i64>,
    pub city_name: String,
    pub temperature: f64,
    pub description: String,
    pub humidity: i32,
    pub wind_speed: f64,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherRecord {
    /// Build an unsaved record from a provider reading.
    pub fn from_reading(city_name: &str, reading: Reading, fetched_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            city_name: city_name.to_string(),
            temperature: reading.temperature,
            description: reading.description,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
            fetched_at,
        }
    }

    /// The same record carrying the key the store assigned.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be reached because of a setup problem.
    #[error("Store configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Database(#[from] DatabaseError),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport failure, unexpected status, or malformed payload.
    #[error("Weather provider unavailable: {0}")]
    Unavailable(#[from] NetworkError),
}

/// Errors surfaced by the cache orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl WeatherError {
    /// True for setup problems rather than transient failures.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            WeatherError::Store(StoreError::Config(_))
                | WeatherError::Provider(ProviderError::Config(_))
        )
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Store(StoreError::Config(c))
            | WeatherError::Provider(ProviderError::Config(c)) => AppError::Config(c),
            WeatherError::Store(StoreError::Database(d)) => AppError::Database(d),
            WeatherError::Provider(ProviderError::Unavailable(n)) => AppError::Network(n),
        }
    }
}
