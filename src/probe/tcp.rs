//! TCP connect probe implementation.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

use super::{error_chain, ProbeError};

/// Split a `host:port` descriptor at the last colon.
///
/// Brackets around IPv6 literals are removed.
pub fn split_host_port(address: &str) -> Result<(&str, u16), ProbeError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ProbeError::Config(format!("missing port in {}", address)))?;

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(ProbeError::Config(format!("missing host in {}", address)));
    }

    let port = port
        .parse::<u16>()
        .map_err(|e| ProbeError::Config(format!("invalid port in {}: {}", address, e)))?;

    Ok((host, port))
}

/// Open a TCP connection to `host:port` and close it straight away.
pub async fn run_tcp_probe(address: &str, timeout: Duration) -> Result<(), ProbeError> {
    let (host, port) = split_host_port(address)?;

    let stream = connect_within(address, timeout, TcpStream::connect((host, port))).await?;

    drop(stream);
    Ok(())
}

/// Resolve a pending connect, giving up once `timeout` has elapsed.
async fn connect_within<F, T>(address: &str, timeout: Duration, connect: F) -> Result<T, ProbeError>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
        .map_err(|e| {
            ProbeError::Network(format!("failed to connect to {}: {}", address, error_chain(&e)))
        })
}
