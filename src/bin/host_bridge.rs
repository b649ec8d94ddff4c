//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them through the host command channel, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;

use herbview::host::sink::BroadcastSink;
use herbview::host::stdio::{EVENT_CAPACITY, run_stdio_bridge};
use herbview::{ContentService, HerbViewConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout is reserved for the JSON protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("herbview=info,herb_search=info")),
        )
        .init();

    let config_path = std::env::var_os("HERBVIEW_CONFIG").map(PathBuf::from);
    let config = HerbViewConfig::load(config_path.as_deref())?;

    tracing::info!(provider = %config.search.provider, "herbview-host starting");

    let (event_tx, _event_rx) = tokio::sync::broadcast::channel(EVENT_CAPACITY);
    let sink = Arc::new(BroadcastSink::new(event_tx.clone()));
    let service = ContentService::from_config(&config, sink)?;

    run_stdio_bridge(service, event_tx).await.map_err(|e| {
        tracing::error!(error = %e, "herbview-host exited with error");
        anyhow::anyhow!("herbview-host failed: {e}")
    })?;

    tracing::info!("herbview-host shut down cleanly");
    Ok(())
}
