//! HTTP probe implementation.

use std::time::Duration;

use super::{error_chain, ProbeError};

/// Run an HTTP GET probe against the given URL.
///
/// Any response below 500 counts as reachable. A 5xx response fails with the
/// reason phrase; transport failures fail with the full error chain.
pub async fn run_http_probe(url: &str, timeout: Duration) -> Result<(), ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Network(error_chain(&e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    if status.as_u16() >= 500 {
        return Err(ProbeError::Server {
            status: status.as_u16(),
            reason: reason_phrase(&response),
        });
    }

    // Read the full body so truncated transfers count as failures
    let _body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    Ok(())
}

/// The reason phrase the server sent. hyper only records it when it differs
/// from the canonical one, so fall back to that and then to the bare code.
fn reason_phrase(response: &reqwest::Response) -> String {
    let status = response.status();
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .or_else(|| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else {
        ProbeError::Network(error_chain(&e))
    }
}
