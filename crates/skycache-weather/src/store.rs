//! Record store contract.
//!
//! The orchestrator reads and writes weather records only through this trait,
//! so any persistence technology can back it.

use async_trait::async_trait;

use crate::types::{StoreError, WeatherRecord};

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for weather records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record by its store-assigned id.
    ///
    /// Returns `None` if no record has that id.
    async fn read_by_id(&self, id: i64) -> StoreResult<Option<WeatherRecord>>;

    /// Get the record for a city (exact, case-sensitive match).
    async fn read_by_city(&self, city_name: &str) -> StoreResult<Option<WeatherRecord>>;

    /// All records, most recently fetched first.
    async fn read_all(&self) -> StoreResult<Vec<WeatherRecord>>;

    /// Insert the record, or overwrite every field but the id of the existing
    /// record for the same city, as one atomic operation.
    ///
    /// Returns the id of the stored row. The `id` field of `record` is ignored.
    async fn upsert_by_city(&self, record: &WeatherRecord) -> StoreResult<i64>;
}
