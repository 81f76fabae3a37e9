//! Weather lookups for SkyCache
//!
//! Serves current weather per city from a persistent record store, falling
//! back to the OpenWeatherMap API when the stored reading is missing or
//! stale and writing the fresh reading back.

pub mod cache;
pub mod clock;
pub mod inflight;
pub mod provider;
pub mod record_store;
pub mod store;
pub mod types;

pub use cache::{is_fresh, WeatherCache, FRESHNESS_WINDOW_MINUTES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use record_store::SqliteRecordStore;
pub use store::{RecordStore, StoreResult};
pub use types::*;
