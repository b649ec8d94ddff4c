//! Assembles the acquisition pipeline from host configuration.

use std::sync::Arc;

use herb_search::{
    AcquireOptions, EventSink, Orchestrator, Query, SearchError, SearchType, Ticket,
};

use crate::config::HerbViewConfig;
use crate::error::{HerbViewError, Result};
use crate::host::contract::{AcquirePayload, DEFAULT_TARGET};
use crate::translation::LibreTranslateClient;

/// Build an orchestrator with the configured translator and renderer.
///
/// # Errors
///
/// Returns [`HerbViewError::Config`] if the configuration is invalid.
pub fn build_orchestrator(config: &HerbViewConfig, sink: Arc<dyn EventSink>) -> Result<Orchestrator> {
    let acquire = config.to_acquire_config()?;
    let mut builder = Orchestrator::builder(acquire).sink(sink);

    if config.translation.enabled {
        let client = LibreTranslateClient::new(&config.translation, &config.search.source_language)?;
        tracing::info!(endpoint = %config.translation.endpoint, "translation enabled");
        builder = builder.translator(Arc::new(client));
    }

    if config.headless.enabled {
        match renderer(config) {
            Some(renderer) => builder = builder.renderer(renderer),
            None => tracing::warn!("headless rendering requested but no renderer is available"),
        }
    }

    builder.build().map_err(|e| HerbViewError::Config(e.to_string()))
}

#[cfg(feature = "headless")]
fn renderer(config: &HerbViewConfig) -> Option<Arc<dyn herb_search::PageRenderer>> {
    use herb_search::fetch::renderer::ChromiumRenderer;

    let renderer = match &config.headless.chromium_path {
        Some(path) => Some(ChromiumRenderer::new(path.clone())),
        None => ChromiumRenderer::discover(),
    }?;
    Some(Arc::new(renderer))
}

#[cfg(not(feature = "headless"))]
fn renderer(_config: &HerbViewConfig) -> Option<Arc<dyn herb_search::PageRenderer>> {
    None
}

/// Something that can start tracked acquisitions for the host channel.
pub trait AcquisitionHandler: Send + Sync + 'static {
    /// Start an acquisition in the background and return its ticket.
    fn submit(&self, target: &str, query: Query, options: AcquireOptions) -> Result<Ticket>;

    /// Options applied where a request leaves fields out.
    fn default_options(&self) -> AcquireOptions {
        AcquireOptions::default()
    }
}

/// Runs acquisitions on an [`Orchestrator`] with configured defaults.
#[derive(Debug, Clone)]
pub struct ContentService {
    orchestrator: Orchestrator,
    defaults: AcquireOptions,
}

impl ContentService {
    pub fn new(orchestrator: Orchestrator, defaults: AcquireOptions) -> Self {
        Self {
            orchestrator,
            defaults,
        }
    }

    /// # Errors
    ///
    /// Returns [`HerbViewError::Config`] if the configuration is invalid.
    pub fn from_config(config: &HerbViewConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let orchestrator = build_orchestrator(config, sink)?;
        Ok(Self::new(orchestrator, config.default_options()))
    }
}

impl AcquisitionHandler for ContentService {
    fn submit(&self, target: &str, query: Query, options: AcquireOptions) -> Result<Ticket> {
        // Results arrive through the event sink; the join handle is not needed.
        let submission = self.orchestrator.submit(target, query, options);
        Ok(submission.ticket)
    }

    fn default_options(&self) -> AcquireOptions {
        self.defaults.clone()
    }
}

/// Turn a `content.acquire` payload into a target, query and options.
///
/// # Errors
///
/// Returns [`HerbViewError::Search`] with a config error for blank text,
/// an unknown provider or search type, or an out-of-range image count.
pub fn resolve_request(
    payload: AcquirePayload,
    defaults: &AcquireOptions,
) -> Result<(String, Query, AcquireOptions)> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(SearchError::Config("content.acquire requires payload.text".into()).into());
    }

    let search_type = match payload.search_type.as_deref() {
        Some(raw) => SearchType::parse(raw).ok_or_else(|| {
            SearchError::Config(format!(
                "unsupported search type `{raw}` (expected subject/indication/free_text)"
            ))
        })?,
        None => SearchType::default(),
    };

    let provider = match payload.provider.as_deref() {
        Some(raw) => herb_search::Provider::parse(raw)
            .ok_or_else(|| SearchError::Config(format!("unsupported provider `{raw}`")))?,
        None => defaults.provider,
    };

    let options = AcquireOptions {
        provider,
        image_count: payload.image_count.unwrap_or(defaults.image_count),
        target_language: payload
            .target_language
            .or_else(|| defaults.target_language.clone()),
    };
    options.validate()?;

    let target = payload
        .target
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET.to_owned());

    Ok((target, Query::new(text, search_type), options))
}
