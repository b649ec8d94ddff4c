//! Bing: a different index from Google, friendlier to automation.
//!
//! Image results carry their metadata as a JSON blob in the `m` attribute
//! of `a.iusc` anchors; `murl` is the full-size image.

use scraper::Html;
use url::Url;

use super::{collect_text, query_url, resolve_url, selector};
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, STANDARD_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Bing,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: "https://www.bing.com/images/search",
    text_endpoint: "https://www.bing.com/search",
    escalation_order: STANDARD_ESCALATION,
    denial_markers: &["b_captcha", "verify you are a human", "please solve the challenge"],
    scale_factor: 0.35,
};

const SNIPPET_SELECTOR: &str =
    "li.b_algo .b_caption p, li.b_algo .b_lineclamp2, li.b_algo .b_lineclamp3, li.b_algo .b_lineclamp4";

/// Bing HTML scraper.
pub struct BingProvider;

impl SearchProvider for BingProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::Bing,
            DESCRIPTOR.image_endpoint,
            &[("q", term), ("qft", "+filterui:photo-photo"), ("FORM", "HDRSC2")],
        )?;
        Ok(PageRequest::html(url))
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        let url = query_url(
            escalator,
            Provider::Bing,
            DESCRIPTOR.text_endpoint,
            &[("q", term), ("setlang", "en")],
        )?;
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
            Capability::Images => parse_image_metadata(payload, base, limit),
            Capability::TextSnippets => collect_text(payload, SNIPPET_SELECTOR, limit),
        };
        tracing::debug!(count = refs.len(), ?surface, "Bing payload parsed");
        refs
    }
}

/// Pull `murl` out of every `a.iusc[m]` JSON blob.
fn parse_image_metadata(html: &str, base: &Url, limit: usize) -> Vec<ExtractedRef> {
    let Some(anchor_sel) = selector("a.iusc") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut urls: Vec<String> = Vec::new();
    for anchor in document.select(&anchor_sel) {
        if urls.len() >= limit {
            break;
        }
        let Some(blob) = anchor.value().attr("m") else {
            continue;
        };
        let murl = serde_json::from_str::<serde_json::Value>(blob)
            .ok()
            .and_then(|meta| meta.get("murl")?.as_str().map(str::to_owned));
        let Some(url) = murl.and_then(|raw| resolve_url(base, &raw)) else {
            tracing::trace!("skipping malformed Bing metadata");
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls.into_iter().map(ExtractedRef::ImageUrl).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_IMAGES_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<ul class="dgControl_list">
  <li><a class="iusc" m='{"murl":"https://herbs.example/chamomile-1.jpg","turl":"https://tse1.mm.bing.net/th?id=1"}' href="/images/search?view=detailV2"></a></li>
  <li><a class="iusc" m='{"murl":"https://herbs.example/chamomile-2.png"}'></a></li>
  <li><a class="iusc" m='{not json'></a></li>
  <li><a class="iusc" m='{"turl":"https://tse1.mm.bing.net/th?id=3"}'></a></li>
  <li><a class="iusc" m='{"murl":"https://herbs.example/chamomile-1.jpg"}'></a></li>
  <li><a class="iusc" m='{"murl":"https://herbs.example/chamomile-3.webp"}'></a></li>
</ul>
</body></html>"#;

    const MOCK_TEXT_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<ol id="b_results">
<li class="b_algo">
  <h2><a href="https://herbs.example/chamomile">Chamomile - Herb Guide</a></h2>
  <div class="b_caption"><p>Chamomile has been used for centuries as a natural remedy for sleep.</p></div>
</li>
<li class="b_algo">
  <h2><a href="https://wiki.example/Chamomile">Chamomile - Wiki</a></h2>
  <p class="b_lineclamp2">Chamomile is a member of the daisy family native to Europe.</p>
</li>
</ol>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://www.bing.com/images/search?q=chamomile").expect("url")
    }

    #[test]
    fn parse_image_metadata_skips_malformed_blobs() {
        let refs = BingProvider.parse(Capability::Images, MOCK_IMAGES_HTML, FetchMode::Direct, &base(), 10);
        assert_eq!(
            refs,
            vec![
                ExtractedRef::ImageUrl("https://herbs.example/chamomile-1.jpg".into()),
                ExtractedRef::ImageUrl("https://herbs.example/chamomile-2.png".into()),
                ExtractedRef::ImageUrl("https://herbs.example/chamomile-3.webp".into()),
            ]
        );
    }

    #[test]
    fn parse_respects_limit() {
        let refs = BingProvider.parse(Capability::Images, MOCK_IMAGES_HTML, FetchMode::Direct, &base(), 2);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn parse_text_captions() {
        let refs = BingProvider.parse(
            Capability::TextSnippets,
            MOCK_TEXT_HTML,
            FetchMode::Direct,
            &base(),
            10,
        );
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0],
            ExtractedRef::Snippet(
                "Chamomile has been used for centuries as a natural remedy for sleep.".into()
            )
        );
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        assert!(BingProvider
            .parse(Capability::Images, "<html><body></body></html>", FetchMode::Direct, &base(), 10)
            .is_empty());
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BingProvider>();
    }
}
