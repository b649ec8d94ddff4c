//! Provider registry and the contract every search backend implements.
//!
//! Each provider module declares a static [`ProviderDescriptor`] and a unit
//! struct implementing [`SearchProvider`]. Dispatch over the closed
//! [`Provider`] enum lives in [`crate::providers`].

use std::future::Future;

use url::Url;

use crate::error::{Result, SearchError};
use crate::fetch::{Escalator, PageRequest};
use crate::providers;
use crate::types::{Capability, ExtractedRef, FetchMode, ImageRef, Provider};

/// Static description of a provider. Defined once, never mutated.
#[derive(Debug)]
pub struct ProviderDescriptor {
    pub id: Provider,
    pub capabilities: &'static [Capability],
    /// Image search surface (query parameters are added per request).
    pub image_endpoint: &'static str,
    /// Text search surface.
    pub text_endpoint: &'static str,
    /// Fetch modes tried in order for every request.
    pub escalation_order: &'static [FetchMode],
    /// Lowercase fragments that identify an anti-automation page.
    pub denial_markers: &'static [&'static str],
    /// Applied to every image after the thumbnail bound.
    pub scale_factor: f32,
}

impl ProviderDescriptor {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Modes for the ordinary engines.
pub(crate) const STANDARD_ESCALATION: &[FetchMode] = &[FetchMode::Direct, FetchMode::HeadlessBrowser];

/// Modes for providers that must never touch the network directly.
pub(crate) const PROXIED_ESCALATION: &[FetchMode] =
    &[FetchMode::ProxiedDirect, FetchMode::ProxiedHeadlessBrowser];

pub(crate) const BOTH_CAPABILITIES: &[Capability] = &[Capability::TextSnippets, Capability::Images];

/// Image references from one search and the fetch mode that found them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSearch {
    pub refs: Vec<ImageRef>,
    pub mode: FetchMode,
}

/// Look up the static descriptor of a provider.
pub fn descriptor(provider: Provider) -> &'static ProviderDescriptor {
    match provider {
        Provider::Google => &providers::google::DESCRIPTOR,
        Provider::Bing => &providers::bing::DESCRIPTOR,
        Provider::DuckDuckGo => &providers::duckduckgo::DESCRIPTOR,
        Provider::Qwant => &providers::qwant::DESCRIPTOR,
        Provider::Baidu => &providers::baidu::DESCRIPTOR,
        Provider::Yandex => &providers::yandex::DESCRIPTOR,
        Provider::Deep => &providers::deep::DESCRIPTOR,
    }
}

/// A stateless search backend.
///
/// Implementors build requests for their surfaces and parse the payloads.
/// The default `search_*` methods drive the [`Escalator`] and map an empty
/// outcome to the right error; providers with multi-step flows override them.
pub trait SearchProvider: Send + Sync {
    fn descriptor(&self) -> &'static ProviderDescriptor;

    /// Request for the image surface.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the endpoint cannot be built.
    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest>;

    /// Request for the text surface.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the endpoint cannot be built.
    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest>;

    /// Extract up to `limit` references from a payload.
    ///
    /// `base` is the request URL, used to resolve relative links. Malformed
    /// fragments are skipped; an unparsable payload yields an empty list.
    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef>;

    /// Find up to `count` image URLs for `term`.
    ///
    /// # Errors
    ///
    /// [`SearchError::ProviderUnavailable`] when no endpoint responded,
    /// [`SearchError::NoResults`] when responses held nothing parsable.
    fn search_images(
        &self,
        escalator: &Escalator,
        term: &str,
        count: usize,
    ) -> impl Future<Output = Result<ImageSearch>> + Send {
        async move {
            let descriptor = self.descriptor();
            if !descriptor.supports(Capability::Images) {
                return Err(SearchError::NoResults(format!(
                    "{} has no image search",
                    descriptor.id
                )));
            }
            let request = self.image_request(escalator, term)?;
            let escalated = escalator
                .escalate(descriptor.id, &request, |payload, mode| {
                    self.parse(Capability::Images, payload, mode, &request.url, count)
                })
                .await?;
            Ok(ImageSearch {
                refs: image_refs(descriptor.id, escalated.items),
                mode: escalated.mode,
            })
        }
    }

    /// Find raw description snippets for `term`.
    ///
    /// # Errors
    ///
    /// Same as [`SearchProvider::search_images`].
    fn search_text(
        &self,
        escalator: &Escalator,
        term: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        async move {
            let descriptor = self.descriptor();
            if !descriptor.supports(Capability::TextSnippets) {
                return Err(SearchError::NoResults(format!(
                    "{} has no text search",
                    descriptor.id
                )));
            }
            let request = self.text_request(escalator, term)?;
            let escalated = escalator
                .escalate(descriptor.id, &request, |payload, mode| {
                    self.parse(
                        Capability::TextSnippets,
                        payload,
                        mode,
                        &request.url,
                        TEXT_PARSE_LIMIT,
                    )
                })
                .await?;
            Ok(snippets(escalated.items))
        }
    }
}

/// Upper bound on raw snippets pulled from one text page.
pub const TEXT_PARSE_LIMIT: usize = 30;

/// Keep only image references, tagged with their provider.
pub fn image_refs(provider: Provider, refs: Vec<ExtractedRef>) -> Vec<ImageRef> {
    refs.into_iter()
        .filter_map(|r| match r {
            ExtractedRef::ImageUrl(url) => Some(ImageRef { url, provider }),
            ExtractedRef::Snippet(_) => None,
        })
        .collect()
}

/// Keep only snippet references.
pub fn snippets(refs: Vec<ExtractedRef>) -> Vec<String> {
    refs.into_iter()
        .filter_map(|r| match r {
            ExtractedRef::Snippet(text) => Some(text),
            ExtractedRef::ImageUrl(_) => None,
        })
        .collect()
}
