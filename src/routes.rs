//! axum routes for the weather API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::surface::{QueryResponse, WeatherQueries};

impl IntoResponse for QueryResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Build the router over the given query handlers.
pub fn router(queries: Arc<WeatherQueries>) -> Router {
    Router::new()
        .route("/api/weather", get(all_weather))
        .route("/api/weather/:city_name", get(weather_by_city))
        .route("/api/weather/id/:id", get(weather_by_id))
        .with_state(queries)
}

async fn all_weather(State(queries): State<Arc<WeatherQueries>>) -> QueryResponse {
    queries.all().await
}

async fn weather_by_city(
    State(queries): State<Arc<WeatherQueries>>,
    Path(city_name): Path<String>,
) -> QueryResponse {
    queries.by_city(&city_name).await
}

async fn weather_by_id(
    State(queries): State<Arc<WeatherQueries>>,
    Path(id): Path<i64>,
) -> QueryResponse {
    queries.by_id(id).await
}
