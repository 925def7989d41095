//! SQLite-backed observation repository

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;
use tracing::{debug, instrument};

use super::ObservationRepository;
use crate::models::{Location, Observation, ObservationId, Pollution, Weather};
use crate::{AirQualityError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS observations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    city            TEXT NOT NULL,
    state           TEXT NOT NULL,
    country         TEXT NOT NULL,
    latitude        REAL NOT NULL,
    longitude       REAL NOT NULL,
    pollution_ts    TEXT NOT NULL,
    aqius           INTEGER NOT NULL,
    mainus          TEXT NOT NULL,
    aqicn           INTEGER NOT NULL,
    maincn          TEXT NOT NULL,
    weather_ts      TEXT NOT NULL,
    temperature     REAL NOT NULL,
    pressure        REAL NOT NULL,
    humidity        REAL NOT NULL,
    wind_speed      REAL NOT NULL,
    wind_direction  REAL NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_observations_ranking
    ON observations(city, aqius DESC, created_at DESC);
";

const COLUMNS: &str = "id, city, state, country, latitude, longitude, \
    pollution_ts, aqius, mainus, aqicn, maincn, \
    weather_ts, temperature, pressure, humidity, wind_speed, wind_direction, created_at";

/// Observation store on a single SQLite connection.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so it sits behind a
/// mutex and every statement runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteObservationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteObservationRepository {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // WAL lets the HTTP readers proceed while the scheduler writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(conn)
    }

    /// Fresh database that lives only as long as this repository
    pub fn in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of stored observations
    pub async fn count(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AirQualityError::persistence(format!("connection lock poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| AirQualityError::persistence(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl ObservationRepository for SqliteObservationRepository {
    #[instrument(name = "save_observation", level = "debug", skip_all, fields(city = %observation.city))]
    async fn save(&self, observation: &Observation) -> Result<Observation> {
        let row = observation.clone();
        let id = self
            .with_connection(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO observations ({}) VALUES \
                         (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                        COLUMNS
                    ),
                    params![
                        row.city,
                        row.state,
                        row.country,
                        row.location.latitude(),
                        row.location.longitude(),
                        encode_timestamp(&row.pollution.timestamp),
                        row.pollution.aqius,
                        row.pollution.mainus,
                        row.pollution.aqicn,
                        row.pollution.maincn,
                        encode_timestamp(&row.weather.timestamp),
                        row.weather.temperature,
                        row.weather.pressure,
                        row.weather.humidity,
                        row.weather.wind_speed,
                        row.weather.wind_direction,
                        encode_timestamp(&row.created_at),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        debug!(id, "Observation stored");
        Ok(observation.clone().with_id(ObservationId(id)))
    }

    #[instrument(name = "find_most_polluted", level = "debug", skip(self))]
    async fn find_most_polluted(&self, city: &str) -> Result<Option<Observation>> {
        let city = city.to_string();
        self.with_connection(move |conn| {
            let observation = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM observations WHERE city = ?1 \
                         ORDER BY aqius DESC, created_at DESC, id DESC LIMIT 1",
                        COLUMNS
                    ),
                    params![city],
                    observation_from_row,
                )
                .optional()?;
            Ok(observation)
        })
        .await
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let location = Location::new(row.get(4)?, row.get(5)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Real, Box::new(e)))?;

    Ok(Observation {
        id: Some(ObservationId(row.get(0)?)),
        city: row.get(1)?,
        state: row.get(2)?,
        country: row.get(3)?,
        location,
        pollution: Pollution {
            timestamp: decode_timestamp(row, 6)?,
            aqius: row.get(7)?,
            mainus: row.get(8)?,
            aqicn: row.get(9)?,
            maincn: row.get(10)?,
        },
        weather: Weather {
            timestamp: decode_timestamp(row, 11)?,
            temperature: row.get(12)?,
            pressure: row.get(13)?,
            humidity: row.get(14)?,
            wind_speed: row.get(15)?,
            wind_direction: row.get(16)?,
        },
        created_at: decode_timestamp(row, 17)?,
    })
}
