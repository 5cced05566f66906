//! SQLite event store implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use super::models::*;

/// How long a write waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Connection lock poisoned")]
    Poisoned,
}

/// Append-only event log backed by a single SQLite table.
///
/// Every write runs in autocommit mode, so an event is on disk once
/// [`Store::insert`] returns.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store at the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Run the embedded migrations. Each one is idempotent.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;

        conn.execute_batch(include_str!("../../migrations/000001_create_events.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        conn.execute_batch(include_str!("../../migrations/000002_events_description_ts.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 2 failed: {}", e)))?;

        Ok(())
    }

    /// Write an event exactly as given.
    pub fn insert(&self, event: &Event) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO events (id, ts, description) VALUES (?1, ?2, ?3)",
            params![event.id, event.ts, event.description],
        )?;
        tracing::debug!("Logged event {} at {}: {}", event.id, event.ts, event.description);
        Ok(())
    }

    /// Write a new event stamped with the current time.
    pub fn append(&self, description: &str) -> Result<Event, DbError> {
        let event = Event::new(description);
        self.insert(&event)?;
        Ok(event)
    }

    /// Write a new outcome event for an endpoint.
    pub fn append_event(&self, kind: EventKind, endpoint: &str) -> Result<Event, DbError> {
        self.append(&event_description(kind, endpoint))
    }

    /// Count events whose description equals `description` with a timestamp
    /// in `[start, end]`, both ends inclusive.
    pub fn count_matching(
        &self,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE description = ?1 AND ts >= ?2 AND ts <= ?3",
            params![description, start.timestamp(), end.timestamp()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count outcome events for an endpoint in `[start, end]`.
    pub fn count_events(
        &self,
        kind: EventKind,
        endpoint: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        self.count_matching(&event_description(kind, endpoint), start, end)
    }

    /// Total number of stored events.
    pub fn count_all(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?)
    }
}
