//! Database model types.

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

/// Outcome recorded for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Success,
    Failure,
}

impl EventKind {
    /// Prefix written into the `description` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Success => "success",
            EventKind::Failure => "failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the stored description for an outcome, e.g. `failed https://example.com`.
///
/// Counting matches on this exact string, so writers and readers must both go
/// through here.
pub fn event_description(kind: EventKind, endpoint: &str) -> String {
    format!("{} {}", kind.as_str(), endpoint)
}

/// A single row of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    /// Seconds since the Unix epoch.
    pub ts: i64,
    pub description: String,
}

impl Event {
    /// New event stamped with the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self::at(description, Utc::now().timestamp())
    }

    /// New event with an explicit timestamp.
    pub fn at(description: impl Into<String>, ts: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ts,
            description: description.into(),
        }
    }
}
