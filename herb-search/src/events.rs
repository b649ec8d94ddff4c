//! Progress and result events emitted while an acquisition runs.
//!
//! Every event carries a [`Ticket`]: the display target it belongs to and
//! a per-target sequence number. A [`RequestTracker`] remembers the newest
//! sequence per target so events from superseded requests can be dropped
//! before they reach the host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::SearchError;
use crate::types::{AcquisitionResult, CandidateImage, FetchMode, FetchOutcome, Provider};

/// Identifies one submitted request for a display target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub target: String,
    pub seq: u64,
}

impl Ticket {
    pub fn new(target: impl Into<String>, seq: u64) -> Self {
        Self {
            target: target.into(),
            seq,
        }
    }

    /// Ticket used by untracked one-shot acquisitions.
    pub fn untracked() -> Self {
        Self::new("default", 0)
    }
}

/// The two independent flows of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Text,
    Images,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Images => "images",
        }
    }
}

/// Something the host may want to show or log.
#[derive(Debug, Clone)]
pub enum AcquisitionEvent {
    /// One escalation step finished.
    FetchAttempted {
        provider: Provider,
        mode: FetchMode,
        url: String,
        outcome: FetchOutcome,
    },
    /// A query variant produced nothing; the next one will be tried.
    VariantExhausted {
        flow: Flow,
        variant: String,
        error: SearchError,
    },
    /// Snippets are final (translated if requested).
    TextReady {
        snippets: Vec<String>,
        translated: bool,
    },
    /// Images are decoded and normalized.
    ImagesReady { images: Vec<CandidateImage> },
    /// Translation failed; untranslated text is shown instead.
    TranslationFailed { error: SearchError },
    /// One flow ended without content. The other may still succeed.
    FlowFailed { flow: Flow, error: SearchError },
    /// Acquisition finished with content.
    Completed(AcquisitionResult),
    /// Acquisition finished with no content at all.
    Failed(SearchError),
}

impl AcquisitionEvent {
    /// Stable snake_case name, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchAttempted { .. } => "fetch_attempted",
            Self::VariantExhausted { .. } => "variant_exhausted",
            Self::TextReady { .. } => "text_ready",
            Self::ImagesReady { .. } => "images_ready",
            Self::TranslationFailed { .. } => "translation_failed",
            Self::FlowFailed { .. } => "flow_failed",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Receives events from the pipeline.
pub trait EventSink: Send + Sync {
    fn emit(&self, ticket: &Ticket, event: AcquisitionEvent);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, ticket: &Ticket, event: AcquisitionEvent) {
        match &event {
            AcquisitionEvent::FetchAttempted {
                provider,
                mode,
                outcome,
                ..
            } => {
                tracing::debug!(
                    target_id = %ticket.target,
                    seq = ticket.seq,
                    %provider,
                    %mode,
                    %outcome,
                    "fetch attempt"
                );
            }
            AcquisitionEvent::Failed(error) | AcquisitionEvent::FlowFailed { error, .. } => {
                tracing::warn!(
                    target_id = %ticket.target,
                    seq = ticket.seq,
                    kind = event.kind(),
                    %error,
                    "acquisition event"
                );
            }
            _ => {
                tracing::debug!(
                    target_id = %ticket.target,
                    seq = ticket.seq,
                    kind = event.kind(),
                    "acquisition event"
                );
            }
        }
    }
}

/// Sink that forwards every event into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(Ticket, AcquisitionEvent)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(Ticket, AcquisitionEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, ticket: &Ticket, event: AcquisitionEvent) {
        if self.tx.send((ticket.clone(), event)).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

/// Remembers the newest request per display target.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: Mutex<HashMap<String, u64>>,
    next_seq: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `target`, superseding any earlier one.
    pub fn begin(&self, target: &str) -> Ticket {
        let mut latest = self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Allocated under the lock so a higher seq is never overwritten by a lower one.
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        latest.insert(target.to_owned(), seq);
        Ticket::new(target, seq)
    }

    /// Whether `ticket` is still the newest request for its target.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let latest = self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        latest.get(&ticket.target) == Some(&ticket.seq)
    }
}

/// Emits events for one ticket, dropping them once the ticket is stale.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn EventSink>,
    ticket: Ticket,
    tracker: Option<Arc<RequestTracker>>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn EventSink>, ticket: Ticket, tracker: Option<Arc<RequestTracker>>) -> Self {
        Self {
            sink,
            ticket,
            tracker,
        }
    }

    /// Reporter that only logs.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink), Ticket::untracked(), None)
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    /// False once a newer request for the same target was submitted.
    pub fn is_current(&self) -> bool {
        self.tracker
            .as_ref()
            .is_none_or(|tracker| tracker.is_current(&self.ticket))
    }

    pub fn emit(&self, event: AcquisitionEvent) {
        if !self.is_current() {
            tracing::trace!(
                target_id = %self.ticket.target,
                seq = self.ticket.seq,
                kind = event.kind(),
                "dropping stale event"
            );
            return;
        }
        self.sink.emit(&self.ticket, event);
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("ticket", &self.ticket)
            .field("tracked", &self.tracker.is_some())
            .finish()
    }
}
