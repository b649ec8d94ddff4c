//! # herb-search
//!
//! Content acquisition for herbview: given an herb, a disease or free
//! text, find a few description snippets and representative images on
//! public search surfaces.
//!
//! ## Design
//!
//! - Seven providers (Google, Bing, DuckDuckGo, Qwant, Baidu, Yandex and a
//!   proxy-only "deep" Google) behind one [`SearchProvider`] contract
//! - Query refinement from most specific to bare text
//! - Escalating fetch: direct HTTP, then a headless renderer, then the
//!   external SOCKS proxy, with denial-page detection
//! - Images deduplicated by normalised URL, decoded and resized for display
//! - Optional translation that never fails an acquisition
//! - Text and image flows run concurrently; partial results arrive as events
//!
//! ## Privacy
//!
//! - Queries are logged only at trace level
//! - Nothing acquired is persisted
//! - No network listeners; this is a library, not a server

pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod http;
pub mod materialize;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod refine;
pub mod translate;
pub mod types;
pub mod url_normalize;

pub use config::{AcquireConfig, AcquireOptions, ProxySettings, MAX_IMAGE_COUNT};
pub use error::{Result, SearchError};
pub use events::{AcquisitionEvent, ChannelSink, EventSink, Flow, RequestTracker, Ticket, TracingSink};
pub use fetch::PageRenderer;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, Submission};
pub use provider::{descriptor, ImageSearch, ProviderDescriptor, SearchProvider};
pub use translate::{Translation, TranslationAdapter, Translator};
pub use types::{
    AcquisitionResult, CandidateImage, Capability, ExtractedRef, FetchAttempt, FetchMode,
    FetchOutcome, ImageRef, Provider, Query, SearchType,
};

/// Acquire snippets and images with the given configuration.
///
/// No renderer and no translator are attached: headless modes are skipped
/// and non-source target languages fall back to untranslated text.
///
/// # Errors
///
/// [`SearchError::Config`] for an invalid configuration, options or empty
/// query; otherwise [`SearchError::ProviderUnavailable`] or
/// [`SearchError::NoResults`] when neither flow found anything.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> herb_search::Result<()> {
/// use herb_search::{AcquireConfig, AcquireOptions, Provider, Query, SearchType};
///
/// let query = Query::new("Chamomile", SearchType::Subject);
/// let options = AcquireOptions {
///     provider: Provider::Bing,
///     ..AcquireOptions::default()
/// };
/// let result = herb_search::acquire(&query, &options, AcquireConfig::default()).await?;
/// for snippet in &result.snippets {
///     println!("{snippet}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn acquire(
    query: &Query,
    options: &AcquireOptions,
    config: AcquireConfig,
) -> Result<AcquisitionResult> {
    Orchestrator::new(config)?.acquire(query, options).await
}
