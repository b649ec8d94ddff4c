//! Pipeline events rendered as host event envelopes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use herb_search::{AcquisitionEvent, CandidateImage, EventSink, Ticket};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::host::contract::{EventEnvelope, events};

/// Broadcasts every host-visible pipeline event as an [`EventEnvelope`].
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl BroadcastSink {
    pub fn new(event_tx: broadcast::Sender<EventEnvelope>) -> Self {
        Self { event_tx }
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, ticket: &Ticket, event: AcquisitionEvent) {
        let kind = event.kind();
        let Some((name, mut payload)) = event_payload(&event) else {
            tracing::trace!(kind, "event not forwarded to host");
            return;
        };
        if let Value::Object(map) = &mut payload {
            map.insert("seq".to_owned(), json!(ticket.seq));
            map.insert("target".to_owned(), json!(ticket.target));
        }
        tracing::debug!(target_id = %ticket.target, seq = ticket.seq, event = name, "host event");
        let envelope = EventEnvelope::new(uuid::Uuid::new_v4().to_string(), name, payload);
        // No subscribers is fine; the bridge may not be listening yet.
        let _ = self.event_tx.send(envelope);
    }
}

/// Host event name and payload for a pipeline event.
///
/// Returns `None` for events that are only logged.
pub fn event_payload(event: &AcquisitionEvent) -> Option<(&'static str, Value)> {
    let rendered = match event {
        AcquisitionEvent::FetchAttempted {
            provider,
            mode,
            url,
            outcome,
        } => (
            events::FETCH_ATTEMPT,
            json!({
                "provider": provider.name(),
                "mode": mode.as_str(),
                "url": url,
                "outcome": outcome.to_string(),
            }),
        ),
        AcquisitionEvent::TextReady {
            snippets,
            translated,
        } => (
            events::TEXT_READY,
            json!({"snippets": snippets, "translated": translated}),
        ),
        AcquisitionEvent::ImagesReady { images } => (
            events::IMAGES_READY,
            json!({"images": encode_images(images)}),
        ),
        AcquisitionEvent::TranslationFailed { error } => (
            events::TRANSLATION_FAILED,
            json!({"error": error.to_string(), "code": error.code()}),
        ),
        AcquisitionEvent::FlowFailed { flow, error } => (
            events::FLOW_FAILED,
            json!({"flow": flow.as_str(), "error": error.to_string(), "code": error.code()}),
        ),
        AcquisitionEvent::Completed(result) => (
            events::COMPLETED,
            json!({
                "provider": result.provider_used.name(),
                "snippet_count": result.snippets.len(),
                "image_count": result.images.len(),
                "translated": result.translated,
                "target_language": result.target_language,
            }),
        ),
        AcquisitionEvent::Failed(error) => (
            events::FAILED,
            json!({"error": error.to_string(), "code": error.code()}),
        ),
        AcquisitionEvent::VariantExhausted { .. } => return None,
    };
    Some(rendered)
}

fn encode_images(images: &[CandidateImage]) -> Vec<Value> {
    images
        .iter()
        .filter_map(|image| match image.encode_png() {
            Ok(png) => {
                let (width, height) = image.display_dimensions();
                Some(json!({
                    "source_url": image.source_url,
                    "provider": image.provider.name(),
                    "width": width,
                    "height": height,
                    "png_base64": STANDARD.encode(png),
                }))
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping image that failed to encode");
                None
            }
        })
        .collect()
}
