//! Run orchestration for the two operating modes.
//!
//! A regular pass probes every endpoint once and alerts on failures. A resume
//! pass summarizes the trailing 24 hours of the event log into one digest.

mod digest;

pub use digest::*;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use thiserror::Error;

use crate::db::{DbError, EventKind, Store};
use crate::notify::{Notifier, NotifyError};
use crate::probe::{run_probe, Endpoint, ProbeSettings, UnrecognizedEndpoint};

/// Subject of the digest mail.
pub const DIGEST_SUBJECT: &str = "Monitoring Daily Resume";

/// Length of the trailing window summarized by a resume pass.
pub const DIGEST_WINDOW_HOURS: i64 = 24;

/// Errors that abort a run.
///
/// Probe failures are not in here: they are recorded and alerted on, and the
/// run continues.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    UnrecognizedEndpoint(#[from] UnrecognizedEndpoint),
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
    #[error("notification delivery failure: {0}")]
    Notification(#[from] NotifyError),
}

/// Counts from one regular pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub failed: usize,
}

/// Ties probes, the event log and the notifier together.
pub struct Monitor {
    store: Store,
    notifier: Notifier,
    endpoints: Vec<String>,
    settings: ProbeSettings,
    from: String,
    to: String,
}

impl Monitor {
    pub fn new(
        store: Store,
        notifier: Notifier,
        endpoints: Vec<String>,
        settings: ProbeSettings,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            endpoints,
            settings,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Probe every endpoint once, in listed order.
    ///
    /// All descriptors are classified before the first probe runs, so an
    /// unrecognized one aborts the pass with nothing written.
    pub async fn run_regular(&self) -> Result<RunSummary, MonitorError> {
        let endpoints = self
            .endpoints
            .iter()
            .map(String::as_str)
            .map(Endpoint::parse)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Starting regular pass over {} endpoints", endpoints.len());

        let mut summary = RunSummary::default();
        for endpoint in &endpoints {
            let outcome = run_probe(endpoint, &self.settings).await;
            summary.checked += 1;

            if outcome.succeeded {
                tracing::info!("{} ({}) is up", endpoint, endpoint.kind);
                self.store.append_event(EventKind::Success, &endpoint.descriptor)?;
            } else {
                summary.failed += 1;
                tracing::warn!("{} ({}) failed: {}", endpoint, endpoint.kind, outcome.detail);
                self.notifier
                    .notify(
                        &alert_subject(&endpoint.descriptor),
                        &alert_body(&endpoint.descriptor, &outcome.detail),
                        &self.from,
                        &self.to,
                    )
                    .await?;
                self.store.append_event(EventKind::Failure, &endpoint.descriptor)?;
            }
        }

        tracing::info!(
            "Regular pass finished: {} checked, {} failed",
            summary.checked,
            summary.failed
        );
        Ok(summary)
    }

    /// Send the digest for the 24 hours ending now.
    pub async fn run_resume(&self) -> Result<Digest, MonitorError> {
        self.run_resume_at(Utc::now()).await
    }

    /// Send the digest for the 24 hours ending at `now`.
    pub async fn run_resume_at(&self, now: DateTime<Utc>) -> Result<Digest, MonitorError> {
        let digest = self.digest_at(now)?;

        tracing::info!(
            "Digest {} .. {}: {} runs, {} errors",
            digest.window_start,
            digest.window_end,
            digest.total_runs(),
            digest.total_errors()
        );

        self.notifier
            .notify(DIGEST_SUBJECT, &digest.render(), &self.from, &self.to)
            .await?;
        Ok(digest)
    }

    /// Aggregate the event log over the window ending at `now`. Read-only.
    pub fn digest_at(&self, now: DateTime<Utc>) -> Result<Digest, MonitorError> {
        let window_start = now - ChronoDuration::hours(DIGEST_WINDOW_HOURS);

        let mut entries = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let failed = self
                .store
                .count_events(EventKind::Failure, endpoint, window_start, now)?;
            let succeeded = self
                .store
                .count_events(EventKind::Success, endpoint, window_start, now)?;
            entries.push(DigestEntry {
                endpoint: endpoint.clone(),
                failed,
                succeeded,
            });
        }

        Ok(Digest {
            window_start,
            window_end: now,
            entries,
        })
    }
}

pub fn alert_subject(endpoint: &str) -> String {
    format!("[URGENT] Service failed for url {}", endpoint)
}

pub fn alert_body(endpoint: &str, detail: &str) -> String {
    format!(
        "Job check for {} failed.\n\nException:\n{}\n",
        endpoint, detail
    )
}
