//! Reachability probe for the external SOCKS proxy.
//!
//! The proxy daemon is owned elsewhere; a closed port is a normal
//! condition that makes the proxied fetch modes fail fast.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::config::ProxySettings;

/// Whether a TCP connection to `host:port` can be opened within `timeout`.
pub async fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!(host, port, error = %e, "proxy unreachable");
            false
        }
        Err(_) => {
            tracing::debug!(host, port, "proxy probe timed out");
            false
        }
    }
}

/// Probe the configured proxy.
pub async fn probe(settings: &ProxySettings) -> bool {
    is_reachable(
        &settings.host,
        settings.port,
        Duration::from_millis(settings.probe_timeout_ms),
    )
    .await
}
