//! End-to-end tests for the weather API.
//!
//! The router is served on an ephemeral port with an in-memory store and a
//! wiremock stand-in for OpenWeatherMap.

use std::sync::Arc;

use skycache::{router, WeatherQueries};
use skycache_weather::{OpenWeatherProvider, SqliteRecordStore, WeatherCache};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_weather(temp: f64, humidity: i32, description: &str, speed: f64) -> serde_json::Value {
    serde_json::json!({
        "weather": [{ "id": 800, "main": "Clear", "description": description, "icon": "01d" }],
        "main": { "temp": temp, "humidity": humidity },
        "wind": { "speed": speed },
        "cod": 200
    })
}

/// Serve the API against the given provider endpoint and return its base URL.
async fn spawn_api(provider_uri: &str) -> String {
    let store = SqliteRecordStore::in_memory().unwrap();
    let provider = OpenWeatherProvider::new("test-key", provider_uri, None).unwrap();
    let cache = WeatherCache::new(Arc::new(store), Arc::new(provider));
    let app = router(Arc::new(WeatherQueries::new(Arc::new(cache))));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_city_lookup_then_id_lookup() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(current_weather(21.5, 40, "clear sky", 2.6)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let base = spawn_api(&mock_server.uri()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/weather/Paris", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let record: serde_json::Value = response.json().await.unwrap();
    assert_eq!(record["cityName"], "Paris");
    assert_eq!(record["description"], "clear sky");
    assert_eq!(record["windSpeed"], 2.6);

    let id = record["id"].as_i64().unwrap();
    let by_id: serde_json::Value = client
        .get(format!("{}/api/weather/id/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id, record);

    let all: serde_json::Value = client
        .get(format!("{}/api/weather", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_city_is_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&mock_server)
        .await;

    let base = spawn_api(&mock_server.uri()).await;
    let response = reqwest::get(format!("{}/api/weather/Atlantis", base))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Weather data not found for city: Atlantis");
}

#[tokio::test]
async fn test_invalid_id_is_400_without_provider_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let base = spawn_api(&mock_server.uri()).await;

    let response = reqwest::get(format!("{}/api/weather/id/0", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid ID");

    let blank = reqwest::get(format!("{}/api/weather/%20%20", base))
        .await
        .unwrap();
    assert_eq!(blank.status(), 400);
}

#[tokio::test]
async fn test_provider_outage_is_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let base = spawn_api(&mock_server.uri()).await;
    let response = reqwest::get(format!("{}/api/weather/Dublin", base))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "An error occurred while retrieving weather data"
    );
}
