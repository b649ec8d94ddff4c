//! Host command channel and router.

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{HerbViewError, Result};
use crate::host::contract::{
    AcquirePayload, CommandEnvelope, CommandName, EVENT_VERSION, EventEnvelope, ResponseEnvelope,
};
use crate::service::{AcquisitionHandler, resolve_request};

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            HerbViewError::Pipeline(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| HerbViewError::Channel(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| HerbViewError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer<H: AcquisitionHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    handler: H,
}

/// Create a client/server pair with a fresh event channel.
///
/// Acquisition events only reach subscribers if the handler's event sink
/// publishes into the same channel; see [`command_channel_with_events`].
#[must_use]
pub fn command_channel<H: AcquisitionHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    command_channel_with_events(request_capacity, event_tx, handler)
}

/// Create a client/server pair around an existing event channel.
#[must_use]
pub fn command_channel_with_events<H: AcquisitionHandler>(
    request_capacity: usize,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    (
        HostCommandClient {
            request_tx,
            event_tx,
        },
        HostCommandServer {
            request_rx,
            handler,
        },
    )
}

impl<H: AcquisitionHandler> HostCommandServer<H> {
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.route(&request.envelope);
            let _ = request.response_tx.send(response);
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"pong": true}),
            )),
            CommandName::HostVersion => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({
                    "contract_version": EVENT_VERSION,
                    "version": env!("CARGO_PKG_VERSION"),
                    "channel": "host_command_v1"
                }),
            )),
            CommandName::ContentAcquire => self.handle_content_acquire(envelope),
            CommandName::RuntimeStop => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"accepted": true}),
            )),
        }
    }

    fn handle_content_acquire(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let payload: AcquirePayload = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HerbViewError::Pipeline(format!("content.acquire payload: {e}")))?;
        let (target, query, options) = resolve_request(payload, &self.handler.default_options())?;
        let provider = options.provider;
        let ticket = self.handler.submit(&target, query, options)?;

        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({
                "accepted": true,
                "target": ticket.target,
                "seq": ticket.seq,
                "provider": provider.name(),
            }),
        ))
    }
}
