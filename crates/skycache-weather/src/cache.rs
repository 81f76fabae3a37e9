//! Cache-or-fetch orchestration.
//!
//! `WeatherCache` serves city lookups from the record store while the stored
//! reading is younger than [`FRESHNESS_WINDOW_MINUTES`], and otherwise asks the
//! provider, writes the reading back, and returns what was written. The store
//! is re-read on every request; nothing is cached in process.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::clock::{Clock, SystemClock};
use crate::inflight::CityLocks;
use crate::provider::WeatherProvider;
use crate::store::RecordStore;
use crate::types::{FetchOutcome, WeatherError, WeatherRecord};

/// Maximum age of a stored reading that may still be served.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 30;

/// True while `fetched_at` is strictly inside the freshness window.
/// A record exactly at the boundary is expired.
pub fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - fetched_at < Duration::minutes(FRESHNESS_WINDOW_MINUTES)
}

/// Store-first weather lookups with provider fallback.
pub struct WeatherCache {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn WeatherProvider>,
    clock: Arc<dyn Clock>,
    inflight: Option<CityLocks>,
}

impl WeatherCache {
    /// Create an orchestrator over `store` and `provider` using wall-clock
    /// time, with concurrent refreshes of one city collapsed.
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            store,
            provider,
            clock: Arc::new(SystemClock),
            inflight: Some(CityLocks::new()),
        }
    }

    /// Use `clock` as the time source for freshness checks and `fetched_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable or disable the per-city refresh guard.
    ///
    /// Without it, simultaneous stale lookups of one city each call the
    /// provider and the last upsert wins; the store still holds one row.
    pub fn with_inflight_dedupe(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(CityLocks::new);
        self
    }

    /// Look up a record by store id. Never consults the provider.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<WeatherRecord>, WeatherError> {
        self.store.read_by_id(id).await.map_err(|e| {
            let e = WeatherError::from(e);
            log_failure(&e, &format!("fetching weather by ID {}", id));
            e
        })
    }

    /// Current weather for `city_name`.
    ///
    /// Returns the stored record if it is fresh. Otherwise fetches from the
    /// provider, upserts, and returns the written record. A provider "unknown
    /// city" yields `Ok(None)` even if a stale record exists; a provider
    /// failure propagates without falling back to stale data.
    pub async fn get_by_city(&self, city_name: &str) -> Result<Option<WeatherRecord>, WeatherError> {
        let result = self.lookup_city(city_name).await;
        if let Err(e) = &result {
            log_failure(e, &format!("fetching weather for city {}", city_name));
        }
        result
    }

    /// Every stored record, most recently fetched first. No freshness filter.
    pub async fn get_all(&self) -> Result<Vec<WeatherRecord>, WeatherError> {
        self.store.read_all().await.map_err(|e| {
            let e = WeatherError::from(e);
            log_failure(&e, "fetching all weather data");
            e
        })
    }

    async fn lookup_city(&self, city_name: &str) -> Result<Option<WeatherRecord>, WeatherError> {
        if let Some(record) = self.fresh_record(city_name).await? {
            tracing::info!("Returning cached data for city: {}", city_name);
            return Ok(Some(record));
        }

        match &self.inflight {
            Some(locks) => {
                let _guard = locks.acquire(city_name).await;
                // Another request may have refreshed the city while we waited.
                if let Some(record) = self.fresh_record(city_name).await? {
                    tracing::debug!("City {} refreshed by a concurrent request", city_name);
                    return Ok(Some(record));
                }
                self.refresh(city_name).await
            }
            None => self.refresh(city_name).await,
        }
    }

    /// The stored record for `city_name` if it is still fresh.
    async fn fresh_record(&self, city_name: &str) -> Result<Option<WeatherRecord>, WeatherError> {
        let stored = self.store.read_by_city(city_name).await?;
        let now = self.clock.now();

        Ok(stored.filter(|record| {
            let fresh = is_fresh(record.fetched_at, now);
            if !fresh {
                tracing::debug!(
                    "Stored data for {} is stale (fetched at {})",
                    city_name,
                    record.fetched_at
                );
            }
            fresh
        }))
    }

    async fn refresh(&self, city_name: &str) -> Result<Option<WeatherRecord>, WeatherError> {
        tracing::info!("Fetching fresh data from provider for city: {}", city_name);

        let reading = match self.provider.fetch(city_name).await? {
            FetchOutcome::Reading(reading) => reading,
            FetchOutcome::NotFound => return Ok(None),
        };

        // Microsecond precision is what the store keeps.
        let fetched_at = self.clock.now().trunc_subsecs(6);
        let record = WeatherRecord::from_reading(city_name, reading, fetched_at);
        let id = self.store.upsert_by_city(&record).await?;

        tracing::debug!("Stored weather for {} as record {}", city_name, id);
        Ok(Some(record.with_id(id)))
    }
}

fn log_failure(err: &WeatherError, context: &str) {
    if err.is_config() {
        tracing::error!(kind = "config", "Configuration error while {}: {}", context, err);
    } else {
        tracing::error!("Error while {}: {}", context, err);
    }
}
