//! Acquisition orchestrator: refine, run text and image flows
//! concurrently, translate, assemble.
//!
//! The text and image flows run as independent tasks and report partial
//! results through the event sink as soon as each finishes. The call fails
//! only if both flows came up empty.

pub mod flows;
pub mod snippets;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{AcquireConfig, AcquireOptions};
use crate::error::{Result, SearchError};
use crate::events::{AcquisitionEvent, EventSink, Flow, Reporter, RequestTracker, Ticket, TracingSink};
use crate::fetch::{Escalator, PageRenderer};
use crate::materialize::Materializer;
use crate::refine::refine;
use crate::translate::{TranslationAdapter, Translator};
use crate::types::{AcquisitionResult, Query};

use self::flows::{image_flow, text_flow, TextOutcome};

/// Terminal error when both flows failed.
///
/// `ProviderUnavailable` wins if either flow ended with it.
pub fn select_failure(text: &SearchError, images: &SearchError) -> SearchError {
    match (text, images) {
        (SearchError::ProviderUnavailable(_), _) => text.clone(),
        (_, SearchError::ProviderUnavailable(_)) => images.clone(),
        (SearchError::NoResults(_), _) => text.clone(),
        (_, SearchError::NoResults(_)) => images.clone(),
        _ => SearchError::NoResults(format!("text: {text}; images: {images}")),
    }
}

struct Inner {
    config: Arc<AcquireConfig>,
    renderer: Option<Arc<dyn PageRenderer>>,
    translation: TranslationAdapter,
    sink: Arc<dyn EventSink>,
    tracker: Arc<RequestTracker>,
}

/// Coordinates acquisitions. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// A tracked acquisition running in the background.
#[derive(Debug)]
pub struct Submission {
    pub ticket: Ticket,
    pub handle: JoinHandle<Result<AcquisitionResult>>,
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: AcquireConfig,
    renderer: Option<Arc<dyn PageRenderer>>,
    translator: Option<Arc<dyn Translator>>,
    sink: Arc<dyn EventSink>,
}

impl OrchestratorBuilder {
    /// Renderer for the headless fetch modes.
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Where events go. Defaults to logging only.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;
        let translation = TranslationAdapter::new(self.translator, self.config.source_language.clone());
        Ok(Orchestrator {
            inner: Arc::new(Inner {
                config: Arc::new(self.config),
                renderer: self.renderer,
                translation,
                sink: self.sink,
                tracker: Arc::new(RequestTracker::new()),
            }),
        })
    }
}

impl Orchestrator {
    pub fn builder(config: AcquireConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            renderer: None,
            translator: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Orchestrator with no renderer, no translator and a logging sink.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid.
    pub fn new(config: AcquireConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.inner.config
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.inner.tracker
    }

    /// Acquire snippets and images for `query`, untracked.
    ///
    /// # Errors
    ///
    /// [`SearchError::Config`] for invalid options or an empty query;
    /// [`SearchError::ProviderUnavailable`] or [`SearchError::NoResults`]
    /// when neither flow produced content.
    pub async fn acquire(&self, query: &Query, options: &AcquireOptions) -> Result<AcquisitionResult> {
        let reporter = Reporter::new(self.inner.sink.clone(), Ticket::untracked(), None);
        self.run(query.clone(), options.clone(), reporter).await
    }

    /// Start a tracked acquisition for a display target.
    ///
    /// A later submission for the same target supersedes this one: its
    /// events stop reaching the sink, though the work runs to completion.
    pub fn submit(&self, target: &str, query: Query, options: AcquireOptions) -> Submission {
        let ticket = self.inner.tracker.begin(target);
        let reporter = Reporter::new(
            self.inner.sink.clone(),
            ticket.clone(),
            Some(self.inner.tracker.clone()),
        );
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run(query, options, reporter).await });
        Submission { ticket, handle }
    }

    async fn run(
        &self,
        query: Query,
        options: AcquireOptions,
        reporter: Reporter,
    ) -> Result<AcquisitionResult> {
        if let Err(e) = validate(&query, &options) {
            reporter.emit(AcquisitionEvent::Failed(e.clone()));
            return Err(e);
        }

        let variants = refine(&query);
        tracing::debug!(
            provider = %options.provider,
            variants = variants.len(),
            image_count = options.image_count,
            "acquisition started"
        );
        tracing::trace!(query = query.raw_text(), "acquisition query");

        let escalator = Escalator::new(
            self.inner.config.clone(),
            self.inner.renderer.clone(),
            reporter.clone(),
        );
        let materializer = Materializer::new(self.inner.config.clone());

        let text_task = tokio::spawn(text_flow(
            escalator.clone(),
            self.inner.translation.clone(),
            options.clone(),
            variants.clone(),
        ));
        let image_task = tokio::spawn(image_flow(escalator, materializer, options.clone(), variants));
        let (text, images) = tokio::join!(text_task, image_task);

        let text = text.unwrap_or_else(|e| Err(aborted(Flow::Text, &e)));
        let images = images.unwrap_or_else(|e| Err(aborted(Flow::Images, &e)));

        match (text, images) {
            (Err(text_err), Err(image_err)) => {
                let error = select_failure(&text_err, &image_err);
                tracing::warn!(provider = %options.provider, error = %error, "acquisition failed");
                reporter.emit(AcquisitionEvent::Failed(error.clone()));
                Err(error)
            }
            (text, images) => {
                let TextOutcome {
                    snippets,
                    translated,
                } = text.unwrap_or_default();
                let result = AcquisitionResult {
                    snippets,
                    images: images.unwrap_or_default(),
                    provider_used: options.provider,
                    translated,
                    target_language: options.target_language.clone(),
                };
                tracing::debug!(
                    snippets = result.snippets.len(),
                    images = result.images.len(),
                    "acquisition completed"
                );
                reporter.emit(AcquisitionEvent::Completed(result.clone()));
                Ok(result)
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.inner.config)
            .field("has_renderer", &self.inner.renderer.is_some())
            .field("translation", &self.inner.translation)
            .finish()
    }
}

fn validate(query: &Query, options: &AcquireOptions) -> Result<()> {
    if query.raw_text().is_empty() {
        return Err(SearchError::Config("query text must not be empty".into()));
    }
    options.validate()
}

fn aborted(flow: Flow, error: &tokio::task::JoinError) -> SearchError {
    tracing::warn!(flow = flow.as_str(), error = %error, "flow task aborted");
    SearchError::NoResults(format!("{} flow aborted: {error}", flow.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchType;

    #[test]
    fn unavailable_wins_failure_selection() {
        let unavailable = SearchError::ProviderUnavailable("down".into());
        let empty = SearchError::NoResults("none".into());
        assert_eq!(select_failure(&empty, &unavailable), unavailable);
        assert_eq!(select_failure(&unavailable, &empty), unavailable);
        assert_eq!(select_failure(&empty, &empty), empty);
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_network() {
        let orchestrator = Orchestrator::new(AcquireConfig::default()).expect("orchestrator");
        let err = orchestrator
            .acquire(&Query::new("   ", SearchType::Subject), &AcquireOptions::default())
            .await
            .expect_err("empty query");
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[tokio::test]
    async fn image_count_out_of_range_is_rejected() {
        let orchestrator = Orchestrator::new(AcquireConfig::default()).expect("orchestrator");
        let options = AcquireOptions {
            image_count: 21,
            ..AcquireOptions::default()
        };
        let err = orchestrator
            .acquire(&Query::new("Chamomile", SearchType::Subject), &options)
            .await
            .expect_err("too many images");
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let config = AcquireConfig {
            download_concurrency: 0,
            ..AcquireConfig::default()
        };
        assert!(Orchestrator::new(config).is_err());
    }
}
