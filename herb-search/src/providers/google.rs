//! Google: best coverage, aggressive bot detection.
//!
//! Image results come from the basic `tbm=isch` page, whose `<img>` nodes
//! point at small gstatic thumbnails (hence the 2.0 scale factor). Text
//! comes from result-card snippet nodes.

use url::Url;

use super::{collect_img_sources, collect_text, query_url};
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub(crate) const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

pub(crate) const DENIAL_MARKERS: &[&str] = &[
    "our systems have detected unusual traffic",
    "/sorry/index",
    "g-recaptcha",
];

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Google,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: SEARCH_ENDPOINT,
    text_endpoint: SEARCH_ENDPOINT,
    escalation_order: STANDARD_ESCALATION,
    denial_markers: DENIAL_MARKERS,
    scale_factor: 2.0,
};

const SNIPPET_SELECTOR: &str = "div.VwiC3b, div.BNeawe.s3v9rd, span.aCOpRe";

/// Google HTML scraper.
pub struct GoogleProvider;

pub(crate) fn image_request(
    escalator: &Escalator,
    provider: Provider,
    term: &str,
) -> Result<PageRequest> {
    let url = query_url(
        escalator,
        provider,
        SEARCH_ENDPOINT,
        &[("q", term), ("tbm", "isch"), ("hl", "en")],
    )?;
    Ok(PageRequest::html(url))
}

pub(crate) fn text_request(
    escalator: &Escalator,
    provider: Provider,
    term: &str,
) -> Result<PageRequest> {
    let url = query_url(escalator, provider, SEARCH_ENDPOINT, &[("q", term), ("hl", "en")])?;
    Ok(PageRequest::html(url))
}

/// Shared with the deep provider, which only differs in routing.
pub(crate) fn parse(surface: Capability, payload: &str, base: &Url, limit: usize) -> Vec<ExtractedRef> {
    let refs = match surface {
        Capability::Images => collect_img_sources(payload, base, "img", is_chrome, limit),
        Capability::TextSnippets => collect_text(payload, SNIPPET_SELECTOR, limit),
    };
    tracing::debug!(count = refs.len(), ?surface, "Google payload parsed");
    refs
}

/// Logos and UI sprites that appear on every results page.
fn is_chrome(url: &str) -> bool {
    url.contains("googlelogo") || url.contains("/images/branding/") || url.ends_with(".svg")
}

impl SearchProvider for GoogleProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        image_request(escalator, Provider::Google, term)
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        text_request(escalator, Provider::Google, term)
    }

    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        _mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef> {
        parse(surface, payload, base, limit)
    }
}
