//! SQLite-based weather record storage.
//!
//! `SqliteRecordStore` implements [`RecordStore`] on a single connection
//! guarded by a mutex; every statement runs on the blocking thread pool so
//! request tasks are never stalled by disk I/O.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use skycache_core::error::RusqliteErrorExt;
use skycache_core::{ConfigError, DatabaseError};

use crate::store::{RecordStore, StoreResult};
use crate::types::{StoreError, WeatherRecord};

const SELECT_COLUMNS: &str =
    "SELECT id, city_name, temperature, description, humidity, wind_speed, fetched_at FROM weather_data";

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `target`.
    ///
    /// # Errors
    /// Returns `StoreError::Config` if `target` is blank or cannot be opened
    /// (e.g. its directory does not exist).
    pub fn open(target: &str) -> StoreResult<Self> {
        if target.trim().is_empty() {
            return Err(ConfigError::missing("database.path").into());
        }

        let conn = Connection::open(Path::new(target)).map_err(|e| {
            match e.into_database_error() {
                DatabaseError::ConnectionFailed(msg) => StoreError::Config(ConfigError::Invalid(
                    format!("cannot open store at {}: {}", target, msg),
                )),
                other => StoreError::Database(other),
            }
        })?;

        let store = Self::from_connection(conn)?;
        tracing::info!("Opened weather store at {}", target);
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city_name TEXT NOT NULL UNIQUE,
                temperature REAL NOT NULL,
                description TEXT NOT NULL,
                humidity INTEGER NOT NULL,
                wind_speed REAL NOT NULL,
                fetched_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_data_fetched_at ON weather_data(fetched_at DESC);
            "#,
        )
        .map_err(db_error)
    }

    /// Convert a database row to a WeatherRecord.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        let fetched_at_str: String = row.get(6)?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(WeatherRecord {
            id: Some(row.get(0)?),
            city_name: row.get(1)?,
            temperature: row.get(2)?,
            description: row.get(3)?,
            humidity: row.get(4)?,
            wind_speed: row.get(5)?,
            fetched_at,
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            op(&*guard).map_err(db_error)
        })
        .await
        .map_err(|e| StoreError::Database(DatabaseError::QueryFailed(e.to_string())))?
    }

    /// Number of stored records.
    pub async fn count(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get::<_, i64>(0))
        })
        .await
        .map(|n| n as usize)
    }
}

fn db_error(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.into_database_error())
}

/// Fixed-width UTC text so lexical order matches chronological order.
fn timestamp_text(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn read_by_id(&self, id: i64) -> StoreResult<Option<WeatherRecord>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn read_by_city(&self, city_name: &str) -> StoreResult<Option<WeatherRecord>> {
        let city_name = city_name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{} WHERE city_name = ?1", SELECT_COLUMNS),
                params![city_name],
                Self::row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn read_all(&self) -> StoreResult<Vec<WeatherRecord>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{} ORDER BY fetched_at DESC, id DESC", SELECT_COLUMNS))?;
            let rows = stmt.query_map([], Self::row_to_record)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn upsert_by_city(&self, record: &WeatherRecord) -> StoreResult<i64> {
        let record = record.clone();
        let id = self
            .with_conn(move |conn| {
                conn.query_row(
                    r#"
                    INSERT INTO weather_data (city_name, temperature, description, humidity, wind_speed, fetched_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(city_name) DO UPDATE SET
                        temperature = excluded.temperature,
                        description = excluded.description,
                        humidity = excluded.humidity,
                        wind_speed = excluded.wind_speed,
                        fetched_at = excluded.fetched_at
                    RETURNING id
                    "#,
                    params![
                        record.city_name,
                        record.temperature,
                        record.description,
                        record.humidity,
                        record.wind_speed,
                        timestamp_text(&record.fetched_at),
                    ],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await?;

        tracing::debug!("Upserted weather record {}", id);
        Ok(id)
    }
}
