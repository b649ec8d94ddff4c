//! Yandex image and web search.

use url::Url;

use super::{collect_img_sources, collect_text, query_url};
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Yandex,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: "https://yandex.com/images/search",
    text_endpoint: "https://yandex.com/search/",
    escalation_order: STANDARD_ESCALATION,
    denial_markers: &["showcaptcha", "are you not a robot"],
    scale_factor: 0.25,
};

const IMAGE_SELECTOR: &str = "img.serp-item__thumb, img.ContentImage-Image";
const SNIPPET_SELECTOR: &str = ".OrganicTextContentSpan, .organic__text";

/// Yandex scraper.
pub struct YandexProvider;

impl SearchProvider for YandexProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(escalator, Provider::Yandex, DESCRIPTOR.image_endpoint, &[("text", term)])?;
        Ok(PageRequest::html(url))
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(escalator, Provider::Yandex, DESCRIPTOR.text_endpoint, &[("text", term)])?;
        Ok(PageRequest::html(url))
    }

    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        _mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef> {
        let refs = match surface {
            Capability::Images => collect_img_sources(payload, base, IMAGE_SELECTOR, is_icon, limit),
            Capability::TextSnippets => collect_text(payload, SNIPPET_SELECTOR, limit),
        };
        tracing::debug!(count = refs.len(), ?surface, "Yandex payload parsed");
        refs
    }
}

fn is_icon(url: &str) -> bool {
    url.ends_with(".svg") || url.contains("/favicon")
}
