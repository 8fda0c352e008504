//! SQLite session history.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use gt7_telemetry_core::{Sample, SessionEvent, TelemetryMessage, TelemetrySink};
use gt7_telemetry_errors::{ErrorContext, ResultExt, SinkError};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info};

const CREATE_SESSIONS: &str = "CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    driver TEXT,
    vehicle TEXT,
    venue TEXT,
    session TEXT,
    best_lap REAL
)";

/// Row written once per completed lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub driver: String,
    pub vehicle: String,
    pub venue: String,
    pub session: String,
    /// Seconds
    pub best_lap: f64,
}

impl SessionRecord {
    pub fn from_event(event: &SessionEvent, best_lap: f64) -> Self {
        Self {
            driver: event.driver.clone(),
            vehicle: event.vehicle.clone(),
            venue: event.venue.clone(),
            session: event.session.clone(),
            best_lap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSession {
    pub id: i64,
    /// UTC, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub driver: String,
    pub vehicle: String,
    pub venue: String,
    pub session: String,
    pub best_lap: f64,
}

fn db_error(e: rusqlite::Error) -> SinkError {
    SinkError::database(e.to_string())
}

/// Thread-safe handle on the sessions database.
#[derive(Debug)]
pub struct SessionDatabase {
    conn: Mutex<Connection>,
}

impl SessionDatabase {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// [`SinkError::Io`] if the parent directory cannot be created,
    /// [`SinkError::Database`] if SQLite fails.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_error)?;
        info!(path = %path.display(), "Connected to session database");
        Self::with_connection(conn)
    }

    /// # Errors
    ///
    /// [`SinkError::Database`] if SQLite fails.
    pub fn in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_error)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute(CREATE_SESSIONS, []).map_err(db_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one row and return its id.
    ///
    /// # Errors
    ///
    /// [`SinkError::Database`] if SQLite fails.
    pub fn insert_session(&self, record: &SessionRecord) -> Result<i64, SinkError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (driver, vehicle, venue, session, best_lap)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.driver,
                record.vehicle,
                record.venue,
                record.session,
                record.best_lap
            ],
        )
        .map_err(db_error)?;
        let id = conn.last_insert_rowid();
        debug!(id, venue = %record.venue, best_lap = record.best_lap, "Session row inserted");
        Ok(id)
    }

    /// Most recent rows first.
    ///
    /// # Errors
    ///
    /// [`SinkError::Database`] if SQLite fails.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<StoredSession>, SinkError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, driver, vehicle, venue, session, best_lap
                 FROM sessions ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![i64::from(limit)], |row| {
                Ok(StoredSession {
                    id: row.get(0)?,
                    timestamp: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    driver: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    vehicle: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    venue: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    session: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    best_lap: row.get::<_, Option<f64>>(6)?.unwrap_or_default(),
                })
            })
            .map_err(db_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
    }
}

/// Writes the running best lap of the active recording on every lap.
#[derive(Debug)]
pub struct DatabaseSink {
    db: Arc<SessionDatabase>,
    event: Option<SessionEvent>,
    best_lap: Option<f64>,
}

impl DatabaseSink {
    pub fn new(db: Arc<SessionDatabase>) -> Self {
        Self {
            db,
            event: None,
            best_lap: None,
        }
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.best_lap
    }
}

#[async_trait]
impl TelemetrySink for DatabaseSink {
    fn name(&self) -> &str {
        "database"
    }

    async fn deliver(&mut self, message: &TelemetryMessage) -> Result<(), SinkError> {
        match message {
            TelemetryMessage::SessionStarted { event, .. } => {
                self.event = Some(event.clone());
                self.best_lap = None;
            }
            TelemetryMessage::EventUpdated(event) => {
                if self.event.is_some() {
                    self.event = Some(event.clone());
                }
            }
            TelemetryMessage::Sample(Sample::Lap(marker)) => {
                let Some(event) = self.event.as_ref() else {
                    return Ok(());
                };
                if marker.lap_time > 0.0 {
                    let best = self
                        .best_lap
                        .map_or(marker.lap_time, |b| b.min(marker.lap_time));
                    self.best_lap = Some(best);
                }
                let record = SessionRecord::from_event(event, self.best_lap.unwrap_or_default());
                let db = Arc::clone(&self.db);
                tokio::task::spawn_blocking(move || db.insert_session(&record))
                    .await
                    .map_context(ErrorContext::new("insert session"), SinkError::Task)??;
            }
            TelemetryMessage::SessionEnded => {
                self.event = None;
                self.best_lap = None;
            }
            TelemetryMessage::Sample(Sample::Channels(_)) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() -> Result<(), Box<dyn std::error::Error>> {
        let db = SessionDatabase::in_memory()?;
        let mut record = SessionRecord {
            driver: "Ayrton".to_string(),
            vehicle: "Honda NSX '17".to_string(),
            venue: "Suzuka".to_string(),
            session: "Race".to_string(),
            best_lap: 121.5,
        };
        let first = db.insert_session(&record)?;
        record.best_lap = 119.25;
        let second = db.insert_session(&record)?;
        assert!(second > first);

        let rows = db.recent_sessions(10)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, second);
        assert_eq!(rows[0].best_lap, 119.25);
        assert_eq!(rows[1].venue, "Suzuka");
        assert_eq!(rows[0].timestamp.len(), 19);

        assert_eq!(db.recent_sessions(1)?.len(), 1);
        Ok(())
    }
}
