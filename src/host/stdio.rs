//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, broadcast};

use crate::error::{HerbViewError, Result};
use crate::host::channel::{HostCommandClient, command_channel_with_events};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::service::AcquisitionHandler;

/// Default request channel capacity for the stdio bridge.
pub const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
pub const EVENT_CAPACITY: usize = 256;

/// Run the bridge on the process's stdin and stdout.
pub async fn run_stdio_bridge<H: AcquisitionHandler>(
    handler: H,
    event_tx: broadcast::Sender<EventEnvelope>,
) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    run_bridge(handler, event_tx, reader, writer).await
}

/// Run the JSON bridge until the reader closes or a `runtime.stop`
/// command is received.
///
/// Three concurrent tasks operate in parallel:
///
/// 1. **Reader** -- reads newline-delimited JSON, dispatches each
///    `CommandEnvelope` through the host command client, and writes the
///    resulting `ResponseEnvelope`.
/// 2. **Event forwarder** -- receives broadcast `EventEnvelope` messages
///    (published by the handler's event sink) and writes them as JSON lines.
/// 3. **Server** -- runs the `HostCommandServer` router loop.
///
/// Acquisitions still in flight when the reader finishes are abandoned;
/// their events are no longer written.
pub async fn run_bridge<H, R, W>(
    handler: H,
    event_tx: broadcast::Sender<EventEnvelope>,
    reader: R,
    writer: W,
) -> Result<()>
where
    H: AcquisitionHandler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = command_channel_with_events(REQUEST_CAPACITY, event_tx, handler);
    let writer = Arc::new(Mutex::new(writer));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut *w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(client, reader, Arc::clone(&writer)).await;

    // The client was dropped by `run_reader`, which closes the request
    // channel and lets the server exit.
    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

/// Read line-by-line, dispatch each command, and write responses.
async fn run_reader<R, W>(client: HostCommandClient, mut reader: R, writer: Arc<Mutex<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| HerbViewError::Channel(format!("failed to read command: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse command envelope");
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                let json = serde_json::to_string(&error_response).map_err(|se| {
                    HerbViewError::Pipeline(format!("failed to serialize parse-error response: {se}"))
                })?;
                let mut w = writer.lock().await;
                write_line(&mut *w, &json).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let request_id = envelope.request_id.clone();

        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "host command failed");
                ResponseEnvelope::error(request_id, e.to_string())
            }
        };

        let json = serde_json::to_string(&response).map_err(|e| {
            HerbViewError::Pipeline(format!("failed to serialize response envelope: {e}"))
        })?;

        {
            let mut w = writer.lock().await;
            write_line(&mut *w, &json).await?;
        }

        if is_stop {
            tracing::info!("runtime.stop received; shutting down bridge");
            break;
        }
    }

    Ok(())
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| HerbViewError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| HerbViewError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| HerbViewError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
