//! Windowed digest of probe results.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

/// Failure and success counts for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub endpoint: String,
    pub failed: i64,
    pub succeeded: i64,
}

impl DigestEntry {
    pub fn runs(&self) -> i64 {
        self.failed + self.succeeded
    }
}

/// Aggregate over `[window_start, window_end]`. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn total_errors(&self) -> i64 {
        self.entries.iter().map(|e| e.failed).sum()
    }

    pub fn total_runs(&self) -> i64 {
        self.total_errors() + self.entries.iter().map(|e| e.succeeded).sum::<i64>()
    }

    /// Plain-text body of the digest mail.
    pub fn render(&self) -> String {
        let mut out = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "Here is your summary from {} until {}:",
            format_local(self.window_start),
            format_local(self.window_end)
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Total Runs: {}", self.total_runs());
        let _ = writeln!(out, "Total Errors: {}", self.total_errors());
        let _ = writeln!(out);
        let _ = writeln!(out, "Per URL (url: errors / runs):");
        for entry in &self.entries {
            let _ = writeln!(out, "\t{}: {} / {}", entry.endpoint, entry.failed, entry.runs());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Have a great day!");

        out
    }
}

/// Local wall-clock time truncated to whole seconds.
fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%dT%H:%M:%S").to_string()
}
