//! Request surface for weather queries.
//!
//! Validates inbound parameters before the orchestrator is touched and maps
//! outcomes to HTTP-style responses. Framework-agnostic; `routes` wires it
//! into axum.

use std::sync::Arc;

use serde::Serialize;
use skycache_core::AppError;
use skycache_weather::WeatherCache;

const RETRIEVAL_FAILED: &str = "An error occurred while retrieving weather data";

/// The response produced for one query.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// JSON body (record, record list, or `{ "error": ... }`).
    pub body: serde_json::Value,
}

impl QueryResponse {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                Self::error(500, RETRIEVAL_FAILED)
            }
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message.into() }),
        }
    }

    fn not_found(message: String) -> Self {
        Self::error(404, message)
    }

    /// Build an error response from an `AppError`.
    pub fn from_error(err: AppError) -> Self {
        match &err {
            AppError::Validation(message) => Self::error(400, message.clone()),
            AppError::Config(_) => Self::error(500, err.user_message()),
            _ => Self::error(500, RETRIEVAL_FAILED),
        }
    }
}

impl From<AppError> for QueryResponse {
    fn from(err: AppError) -> Self {
        Self::from_error(err)
    }
}

/// Reject blank city names.
pub fn validate_city(city_name: &str) -> Result<(), AppError> {
    if city_name.trim().is_empty() {
        return Err(AppError::validation("City name is required"));
    }
    Ok(())
}

/// Reject non-positive ids.
pub fn validate_id(id: i64) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::validation("Invalid ID"));
    }
    Ok(())
}

/// Weather query handlers.
pub struct WeatherQueries {
    cache: Arc<WeatherCache>,
}

impl WeatherQueries {
    pub fn new(cache: Arc<WeatherCache>) -> Self {
        Self { cache }
    }

    /// `GET /api/weather`
    pub async fn all(&self) -> QueryResponse {
        match self.cache.get_all().await {
            Ok(records) => QueryResponse::ok(&records),
            Err(e) => AppError::from(e).into(),
        }
    }

    /// `GET /api/weather/{city}`
    pub async fn by_city(&self, city_name: &str) -> QueryResponse {
        if let Err(e) = validate_city(city_name) {
            return e.into();
        }

        match self.cache.get_by_city(city_name).await {
            Ok(Some(record)) => QueryResponse::ok(&record),
            Ok(None) => QueryResponse::not_found(format!(
                "Weather data not found for city: {}",
                city_name
            )),
            Err(e) => AppError::from(e).into(),
        }
    }

    /// `GET /api/weather/id/{id}`
    pub async fn by_id(&self, id: i64) -> QueryResponse {
        if let Err(e) = validate_id(id) {
            return e.into();
        }

        match self.cache.get_by_id(id).await {
            Ok(Some(record)) => QueryResponse::ok(&record),
            Ok(None) => QueryResponse::not_found(format!("Weather data not found for ID: {}", id)),
            Err(e) => AppError::from(e).into(),
        }
    }
}
