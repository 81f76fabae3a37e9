//! SkyCache: current weather per city, served from a persistent store and
//! refreshed from OpenWeatherMap when stale.

pub mod routes;
pub mod surface;

pub use routes::router;
pub use surface::{QueryResponse, WeatherQueries};
