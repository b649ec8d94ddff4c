//! Qwant: JSON APIs for both images and web results.

use url::Url;

use super::{json_body, normalize_whitespace, query_url, resolve_url};
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Qwant,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: "https://api.qwant.com/api/search/images",
    text_endpoint: "https://api.qwant.com/v3/search/web",
    escalation_order: STANDARD_ESCALATION,
    denial_markers: &["\"error_code\":27", "\"error_code\": 27", "captcha-delivery"],
    scale_factor: 0.25,
};

/// Qwant JSON API client.
pub struct QwantProvider;

impl SearchProvider for QwantProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::Qwant,
            DESCRIPTOR.image_endpoint,
            &[
                ("count", "50"),
                ("q", term),
                ("t", "images"),
                ("safesearch", "1"),
                ("locale", "en_US"),
                ("uiv", "4"),
            ],
        )?;
        Ok(PageRequest::json(url))
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::Qwant,
            DESCRIPTOR.text_endpoint,
            &[
                ("q", term),
                ("count", "10"),
                ("locale", "en_US"),
                ("offset", "0"),
                ("device", "desktop"),
                ("safesearch", "1"),
            ],
        )?;
        Ok(PageRequest::json(url))
    }

    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef> {
        let Some(json) = json_body(payload, mode) else {
            tracing::debug!(?surface, "Qwant payload is not JSON");
            return Vec::new();
        };
        let refs = match surface {
            Capability::Images => parse_images(&json, base, limit),
            Capability::TextSnippets => parse_web(&json, limit),
        };
        tracing::debug!(count = refs.len(), ?surface, "Qwant payload parsed");
        refs
    }
}

/// `data.result.items[].media`
fn parse_images(json: &serde_json::Value, base: &Url, limit: usize) -> Vec<ExtractedRef> {
    let items = json
        .pointer("/data/result/items")
        .and_then(|i| i.as_array())
        .into_iter()
        .flatten();

    let mut urls: Vec<String> = Vec::new();
    for item in items {
        if urls.len() >= limit {
            break;
        }
        let Some(url) = item
            .get("media")
            .and_then(|m| m.as_str())
            .and_then(|raw| resolve_url(base, raw))
        else {
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls.into_iter().map(ExtractedRef::ImageUrl).collect()
}

/// `data.result.items.mainline[].items[].desc`
fn parse_web(json: &serde_json::Value, limit: usize) -> Vec<ExtractedRef> {
    json.pointer("/data/result/items/mainline")
        .and_then(|m| m.as_array())
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(|t| t.as_str()).is_none_or(|t| t == "web"))
        .filter_map(|block| block.get("items").and_then(|i| i.as_array()))
        .flatten()
        .filter_map(|item| item.get("desc").and_then(|d| d.as_str()))
        .map(normalize_whitespace)
        .filter(|text| !text.is_empty())
        .take(limit)
        .map(ExtractedRef::Snippet)
        .collect()
}
