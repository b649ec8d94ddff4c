//! Baidu image and web search.
//!
//! The image page is mostly script-driven; static `<img>` nodes are tried
//! first, then thumbnail URLs embedded in the inline result data.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{collect_img_sources, collect_text, query_url, resolve_url};
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Baidu,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: "https://image.baidu.com/search/index",
    text_endpoint: "https://www.baidu.com/s",
    escalation_order: STANDARD_ESCALATION,
    denial_markers: &["百度安全验证", "wappass.baidu.com"],
    scale_factor: 0.25,
};

const IMAGE_SELECTOR: &str = "img.main_img, li.imgitem img";
const SNIPPET_SELECTOR: &str = ".c-abstract, span.content-right_8Zs40, .c-span-last .content-right_1THTn";

static EMBEDDED_THUMB: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""(?:thumbURL|middleURL|objURL)"\s*:\s*"(https?:\\?/\\?/[^"]+)""#).ok());

/// Baidu scraper.
pub struct BaiduProvider;

impl SearchProvider for BaiduProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::Baidu,
            DESCRIPTOR.image_endpoint,
            &[("tn", "baiduimage"), ("word", term)],
        )?;
        Ok(PageRequest::html(url))
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(escalator, Provider::Baidu, DESCRIPTOR.text_endpoint, &[("wd", term)])?;
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
            Capability::Images => {
                let found = collect_img_sources(payload, base, IMAGE_SELECTOR, is_static_asset, limit);
                if found.is_empty() {
                    embedded_thumbnails(payload, base, limit)
                } else {
                    found
                }
            }
            Capability::TextSnippets => collect_text(payload, SNIPPET_SELECTOR, limit),
        };
        tracing::debug!(count = refs.len(), ?surface, "Baidu payload parsed");
        refs
    }
}

/// Page chrome served from Baidu's static hosts.
fn is_static_asset(url: &str) -> bool {
    url.contains("/static/") || url.ends_with(".svg") || url.ends_with(".gif")
}

fn embedded_thumbnails(payload: &str, base: &Url, limit: usize) -> Vec<ExtractedRef> {
    let Some(pattern) = EMBEDDED_THUMB.as_ref() else {
        return Vec::new();
    };
    let mut urls: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(payload) {
        if urls.len() >= limit {
            break;
        }
        let Some(url) = caps
            .get(1)
            .and_then(|m| resolve_url(base, &m.as_str().replace("\\/", "/")))
        else {
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls.into_iter().map(ExtractedRef::ImageUrl).collect()
}
