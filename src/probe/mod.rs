//! Probe module for endpoint checks.
//!
//! Supports HTTP(S) GET and raw TCP connect probes.

mod http;
mod tcp;

#[cfg(test)]
pub(crate) mod test_support;

pub use http::*;
pub use tcp::*;

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Url;
use thiserror::Error;

/// Default connect timeout for TCP probes.
pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP probes.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe error types.
///
/// These never leave the probe layer as errors: each one is folded into a
/// failed [`ProbeOutcome`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {reason}")]
    Server { status: u16, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProbeError {
    /// Diagnostic text stored on the failed outcome.
    ///
    /// Server errors report only the reason phrase; everything else reports
    /// the full message.
    pub fn detail(&self) -> String {
        match self {
            ProbeError::Server { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Protocol used to check an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Http,
    Tcp,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Http => write!(f, "http"),
            ProbeKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Descriptor could not be matched to any probe protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot determine type: {0}")]
pub struct UnrecognizedEndpoint(pub String);

/// Determine which probe applies to an endpoint descriptor.
///
/// `http`/`https` URLs map to [`ProbeKind::Http`]; `host:port` pairs with an
/// all-digit port map to [`ProbeKind::Tcp`].
pub fn classify(descriptor: &str) -> Result<ProbeKind, UnrecognizedEndpoint> {
    if let Ok(url) = Url::parse(descriptor) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(ProbeKind::Http);
        }
    }

    static HOST_PORT: OnceLock<Regex> = OnceLock::new();
    let re = HOST_PORT.get_or_init(|| Regex::new(r"^[^/\s]+:[0-9]+$").unwrap());
    if re.is_match(descriptor) {
        return Ok(ProbeKind::Tcp);
    }

    Err(UnrecognizedEndpoint(descriptor.to_string()))
}

/// A classified endpoint, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub descriptor: String,
    pub kind: ProbeKind,
}

impl Endpoint {
    pub fn parse(descriptor: &str) -> Result<Self, UnrecognizedEndpoint> {
        Ok(Self {
            descriptor: descriptor.to_string(),
            kind: classify(descriptor)?,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub succeeded: bool,
    /// Empty on success.
    pub detail: String,
}

impl ProbeOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            detail: String::new(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            detail: detail.into(),
        }
    }
}

impl From<Result<(), ProbeError>> for ProbeOutcome {
    fn from(result: Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => ProbeOutcome::success(),
            Err(e) => ProbeOutcome::failure(e.detail()),
        }
    }
}

/// Timeouts applied to each probe kind.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub http_timeout: Duration,
    pub tcp_timeout: Duration,
}

/// Run the probe matching the endpoint's kind.
pub async fn run_probe(endpoint: &Endpoint, settings: &ProbeSettings) -> ProbeOutcome {
    let result = match endpoint.kind {
        ProbeKind::Http => run_http_probe(&endpoint.descriptor, settings.http_timeout).await,
        ProbeKind::Tcp => run_tcp_probe(&endpoint.descriptor, settings.tcp_timeout).await,
    };

    if let Err(e) = &result {
        tracing::debug!("Probe {} ({}) failed: {}", endpoint, endpoint.kind, e);
    }

    result.into()
}

/// Render an error and every error in its source chain.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
