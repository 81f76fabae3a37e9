//! Weather provider contract and the OpenWeatherMap implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use skycache_core::error::ReqwestErrorExt;
use skycache_core::{ConfigError, NetworkError, ProviderConfig};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::types::{FetchOutcome, ProviderError, Reading, UNKNOWN_DESCRIPTION};

/// Source of current weather readings for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch a fresh reading for `city_name`.
    ///
    /// An unknown city is `Ok(FetchOutcome::NotFound)`. Every other failure
    /// (transport, unexpected status, malformed payload) is
    /// `Err(ProviderError::Unavailable)`.
    async fn fetch(&self, city_name: &str) -> Result<FetchOutcome, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

/// Normalize an OpenWeatherMap current-weather body (requested with
/// `units=metric`) into a [`Reading`].
fn parse_reading(body: &str) -> Result<Reading, NetworkError> {
    let response: CurrentWeatherResponse = serde_json::from_str(body)
        .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

    let condition = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| NetworkError::InvalidResponse("missing weather[0]".to_string()))?;

    let description = condition
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());

    Ok(Reading {
        temperature: response.main.temp,
        description,
        humidity: response.main.humidity,
        wind_speed: response.wind.speed,
    })
}

/// OpenWeatherMap current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    endpoint: Url,
    api_key: String,
}

impl OpenWeatherProvider {
    /// Create a client against `base_url` (e.g. `https://api.openweathermap.org/data/2.5`).
    ///
    /// `timeout` of `None` keeps the transport default.
    ///
    /// # Errors
    /// Returns `ProviderError::Config` if the API key is blank or the URL is invalid.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::missing("provider.api_key").into());
        }

        let endpoint = Url::parse(&format!("{}/weather", base_url.trim_end_matches('/')))
            .map_err(|e| ConfigError::Invalid(format!("provider.base_url: {}", e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            endpoint,
            api_key,
        })
    }

    /// Create a client from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Self::new(
            config.api_key.clone(),
            &config.base_url,
            config.timeout_secs.map(Duration::from_secs),
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, city_name: &str) -> Result<FetchOutcome, ProviderError> {
        tracing::debug!("Requesting current weather for {}", city_name);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("q", city_name),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            // The URL carries the API key; keep it out of error messages.
            .map_err(|e| e.without_url().into_network_error())?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!("City not found: {}", city_name);
            return Ok(FetchOutcome::NotFound);
        }

        let body = response
            .text()
            .await
            .map_err(|e| e.without_url().into_network_error())?;

        if !status.is_success() {
            tracing::error!("Weather API request failed with status {}: {}", status, body);
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        let reading = parse_reading(&body).map_err(|e| {
            tracing::error!("Malformed weather payload for {}: {}", city_name, e);
            e
        })?;

        Ok(FetchOutcome::Reading(reading))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn body(description: serde_json::Value) -> String {
        serde_json::json!({
            "weather": [{ "id": 500, "main": "Rain", "description": description }],
            "main": { "temp": 15.2, "feels_like": 14.9, "humidity": 80 },
            "wind": { "speed": 4.1, "deg": 240 },
            "name": "Dublin"
        })
        .to_string()
    }

    #[test]
    fn test_parse_reading_extracts_fields() {
        let reading = parse_reading(&body("light rain".into())).unwrap();
        assert_eq!(
            reading,
            Reading {
                temperature: 15.2,
                description: "light rain".to_string(),
                humidity: 80,
                wind_speed: 4.1,
            }
        );
    }

    #[test]
    fn test_missing_description_uses_placeholder() {
        let reading = parse_reading(&body(serde_json::Value::Null)).unwrap();
        assert_eq!(reading.description, UNKNOWN_DESCRIPTION);

        let reading = parse_reading(&body("   ".into())).unwrap();
        assert_eq!(reading.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn test_empty_weather_array_is_malformed() {
        let json = serde_json::json!({
            "weather": [],
            "main": { "temp": 1.0, "humidity": 50 },
            "wind": { "speed": 0.0 }
        })
        .to_string();
        assert!(matches!(parse_reading(&json), Err(NetworkError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_numeric_field_is_malformed() {
        let json = serde_json::json!({
            "weather": [{ "description": "clear sky" }],
            "main": { "humidity": 50 },
            "wind": { "speed": 0.0 }
        })
        .to_string();
        assert!(matches!(parse_reading(&json), Err(NetworkError::InvalidResponse(_))));
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(
            parse_reading("<html>oops</html>"),
            Err(NetworkError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_blank_api_key_is_config_error() {
        let result = OpenWeatherProvider::new("", "https://api.openweathermap.org/data/2.5", None);
        assert!(matches!(result, Err(ProviderError::Config(ConfigError::MissingSetting(_)))));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let provider =
            OpenWeatherProvider::new("key", "https://api.openweathermap.org/data/2.5/", None)
                .unwrap();
        assert_eq!(
            provider.endpoint.as_str(),
            "https://api.openweathermap.org/data/2.5/weather"
        );
    }
}
