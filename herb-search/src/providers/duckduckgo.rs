//! DuckDuckGo: the most scraper-tolerant engine.
//!
//! Text comes from the JavaScript-free HTML endpoint. Images need two
//! steps: a bootstrap page that embeds a `vqd` token, then the `i.js` JSON
//! API queried with that token, following `next` for more pages.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{collect_text, json_body, query_url, resolve_url};
use crate::error::{Result, SearchError};
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{
    image_refs, ImageSearch, ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION,
};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::DuckDuckGo,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: "https://duckduckgo.com/i.js",
    text_endpoint: "https://html.duckduckgo.com/html/",
    escalation_order: STANDARD_ESCALATION,
    denial_markers: &["unfortunately, bots use duckduckgo too", "anomaly-modal"],
    scale_factor: 0.25,
};

const TOKEN_ENDPOINT: &str = "https://duckduckgo.com/";
const REFERER: &str = "https://duckduckgo.com/";
const SNIPPET_SELECTOR: &str = ".result:not(.result--ad) .result__snippet";
const MAX_IMAGE_PAGES: usize = 3;

static VQD_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"vqd=["']?([\d-]+)["'&]"#).ok());

/// DuckDuckGo scraper.
pub struct DuckDuckGoProvider;

/// Extract the `vqd` token from the bootstrap page.
pub(crate) fn extract_vqd(html: &str) -> Option<String> {
    let pattern = VQD_PATTERN.as_ref()?;
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// One page of the image API: URLs plus the relative `next` link.
fn parse_image_page(
    payload: &str,
    mode: FetchMode,
    base: &Url,
    limit: usize,
) -> (Vec<ExtractedRef>, Option<String>) {
    let Some(json) = json_body(payload, mode) else {
        return (Vec::new(), None);
    };
    let next = json
        .get("next")
        .and_then(|n| n.as_str())
        .map(str::to_owned);

    let mut urls: Vec<String> = Vec::new();
    for item in json
        .get("results")
        .and_then(|r| r.as_array())
        .into_iter()
        .flatten()
    {
        if urls.len() >= limit {
            break;
        }
        let Some(url) = item
            .get("image")
            .and_then(|i| i.as_str())
            .and_then(|raw| resolve_url(base, raw))
        else {
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    (urls.into_iter().map(ExtractedRef::ImageUrl).collect(), next)
}

/// Follow-up request for a `next` link, keeping the token.
fn next_page(current: &Url, next: &str, vqd: &str) -> Option<PageRequest> {
    let mut url = current.join(next).ok()?;
    if !url.query_pairs().any(|(k, _)| k == "vqd") {
        url.query_pairs_mut().append_pair("vqd", vqd);
    }
    Some(PageRequest::json(url).with_header("Referer", REFERER))
}

impl SearchProvider for DuckDuckGoProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    /// The token bootstrap page; the image API itself needs its token.
    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::DuckDuckGo,
            TOKEN_ENDPOINT,
            &[("q", term), ("iax", "images"), ("ia", "images")],
        )?;
        Ok(PageRequest::html(url))
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::DuckDuckGo,
            DESCRIPTOR.text_endpoint,
            &[("q", term)],
        )?;
        Ok(PageRequest::html(url))
    }

    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef> {
        let refs = match surface {
            Capability::Images => parse_image_page(payload, mode, base, limit).0,
            Capability::TextSnippets => collect_text(payload, SNIPPET_SELECTOR, limit),
        };
        tracing::debug!(count = refs.len(), ?surface, "DuckDuckGo payload parsed");
        refs
    }

    async fn search_images(
        &self,
        escalator: &Escalator,
        term: &str,
        count: usize,
    ) -> Result<ImageSearch> {
        let bootstrap = self.image_request(escalator, term)?;
        let token = escalator
            .escalate(Provider::DuckDuckGo, &bootstrap, |payload, _mode| {
                extract_vqd(payload).into_iter().collect()
            })
            .await?;
        let vqd = token
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NoResults("DuckDuckGo: missing vqd token".into()))?;
        tracing::trace!(vqd, "DuckDuckGo token acquired");

        let url = query_url(
            escalator,
            Provider::DuckDuckGo,
            DESCRIPTOR.image_endpoint,
            &[
                ("l", "us-en"),
                ("o", "json"),
                ("q", term),
                ("vqd", &vqd),
                ("f", ",,,,,"),
                ("p", "1"),
            ],
        )?;
        let mut request = PageRequest::json(url).with_header("Referer", REFERER);
        let mut found: Vec<ExtractedRef> = Vec::new();
        let mut mode = token.mode;

        for page in 0..MAX_IMAGE_PAGES {
            let remaining = count.saturating_sub(found.len());
            let mut next = None;
            let result = escalator
                .escalate(Provider::DuckDuckGo, &request, |payload, mode| {
                    let (refs, link) = parse_image_page(payload, mode, &request.url, remaining);
                    next = link;
                    refs
                })
                .await;

            match result {
                Ok(escalated) => {
                    if page == 0 {
                        mode = escalated.mode;
                    }
                    for image in escalated.items {
                        if !found.contains(&image) {
                            found.push(image);
                        }
                    }
                }
                Err(e) if found.is_empty() => return Err(e),
                Err(e) => {
                    tracing::debug!(page, error = %e, "DuckDuckGo paging stopped");
                    break;
                }
            }

            if found.len() >= count {
                break;
            }
            let Some(follow) = next.and_then(|link| next_page(&request.url, &link, &vqd)) else {
                break;
            };
            request = follow;
        }

        found.truncate(count);
        Ok(ImageSearch {
            refs: image_refs(Provider::DuckDuckGo, found),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_TOKEN_HTML: &str = r#"<html><head><script>
        DDG.deep.initialize('/d.js?q=chamomile&l=us-en&s=0&dl=en&ct=US&vqd=4-123456789012345678901234567890&p_ent=');
    </script></head><body></body></html>"#;

    const MOCK_IMAGES_JSON: &str = r#"{
        "results": [
            {"image": "https://herbs.example/chamomile-1.jpg", "thumbnail": "https://tse.example/1"},
            {"image": "https://herbs.example/chamomile-2.jpg"},
            {"title": "no image field"},
            {"image": "data:image/png;base64,AAAA"}
        ],
        "next": "i.js?q=chamomile&o=json&p=1&s=100&u=bing&f=,,,,,&l=us-en"
    }"#;

    const MOCK_TEXT_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="https://herbs.example/chamomile">Chamomile</a>
    <a class="result__snippet" href="https://herbs.example/chamomile">
        Chamomile is one of the oldest and most widely used medicinal herbs.
    </a>
</div>
<div class="result result--ad">
    <a class="result__snippet">Buy chamomile tea online with free shipping today.</a>
</div>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://duckduckgo.com/i.js?q=chamomile&o=json").expect("url")
    }

    #[test]
    fn extracts_vqd_token() {
        assert_eq!(
            extract_vqd(MOCK_TOKEN_HTML).as_deref(),
            Some("4-123456789012345678901234567890")
        );
        assert_eq!(extract_vqd(r#"vqd="4-99""#).as_deref(), Some("4-99"));
        assert!(extract_vqd("<html>no token</html>").is_none());
    }

    #[test]
    fn parses_image_page_and_next_link() {
        let (refs, next) = parse_image_page(MOCK_IMAGES_JSON, FetchMode::Direct, &base(), 10);
        assert_eq!(
            refs,
            vec![
                ExtractedRef::ImageUrl("https://herbs.example/chamomile-1.jpg".into()),
                ExtractedRef::ImageUrl("https://herbs.example/chamomile-2.jpg".into()),
            ]
        );
        assert!(next.expect("next").starts_with("i.js?"));
    }

    #[test]
    fn malformed_json_yields_nothing() {
        let (refs, next) = parse_image_page("{\"results\": [", FetchMode::Direct, &base(), 10);
        assert!(refs.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn next_page_keeps_token() {
        let req = next_page(&base(), "i.js?q=chamomile&s=100", "4-1").expect("request");
        assert_eq!(req.url.path(), "/i.js");
        assert!(req.url.query_pairs().any(|(k, v)| k == "vqd" && v == "4-1"));
        assert!(req.url.query_pairs().any(|(k, v)| k == "s" && v == "100"));
        assert!(req.expects_json);
    }

    #[test]
    fn parses_text_snippets_without_ads() {
        let base = Url::parse("https://html.duckduckgo.com/html/?q=chamomile").expect("url");
        let refs = DuckDuckGoProvider.parse(
            Capability::TextSnippets,
            MOCK_TEXT_HTML,
            FetchMode::Direct,
            &base,
            10,
        );
        assert_eq!(
            refs,
            vec![ExtractedRef::Snippet(
                "Chamomile is one of the oldest and most widely used medicinal herbs.".into()
            )]
        );
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DuckDuckGoProvider>();
    }
}
