//! Per-engine providers and the registry dispatch over [`Provider`].
//!
//! Parsers never fail: malformed fragments are skipped and an unparsable
//! payload yields an empty list, which the escalator treats as "try the
//! next mode".

pub mod baidu;
pub mod bing;
pub mod deep;
pub mod duckduckgo;
pub mod google;
pub mod qwant;
pub mod yandex;

pub use baidu::BaiduProvider;
pub use bing::BingProvider;
pub use deep::DeepProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use google::GoogleProvider;
pub use qwant::QwantProvider;
pub use yandex::YandexProvider;

use scraper::{Html, Selector};
use url::Url;

use crate::error::Result;
use crate::fetch::Escalator;
use crate::provider::{ImageSearch, SearchProvider};
use crate::types::{ExtractedRef, FetchMode, Provider};

/// Search `provider` for up to `count` image URLs.
///
/// # Errors
///
/// See [`SearchProvider::search_images`].
pub async fn search_images(
    provider: Provider,
    escalator: &Escalator,
    term: &str,
    count: usize,
) -> Result<ImageSearch> {
    tracing::trace!(term, %provider, "image search");
    match provider {
        Provider::Google => GoogleProvider.search_images(escalator, term, count).await,
        Provider::Bing => BingProvider.search_images(escalator, term, count).await,
        Provider::DuckDuckGo => DuckDuckGoProvider.search_images(escalator, term, count).await,
        Provider::Qwant => QwantProvider.search_images(escalator, term, count).await,
        Provider::Baidu => BaiduProvider.search_images(escalator, term, count).await,
        Provider::Yandex => YandexProvider.search_images(escalator, term, count).await,
        Provider::Deep => DeepProvider.search_images(escalator, term, count).await,
    }
}

/// Search `provider` for raw description snippets.
///
/// # Errors
///
/// See [`SearchProvider::search_text`].
pub async fn search_text(
    provider: Provider,
    escalator: &Escalator,
    term: &str,
) -> Result<Vec<String>> {
    tracing::trace!(term, %provider, "text search");
    match provider {
        Provider::Google => GoogleProvider.search_text(escalator, term).await,
        Provider::Bing => BingProvider.search_text(escalator, term).await,
        Provider::DuckDuckGo => DuckDuckGoProvider.search_text(escalator, term).await,
        Provider::Qwant => QwantProvider.search_text(escalator, term).await,
        Provider::Baidu => BaiduProvider.search_text(escalator, term).await,
        Provider::Yandex => YandexProvider.search_text(escalator, term).await,
        Provider::Deep => DeepProvider.search_text(escalator, term).await,
    }
}

/// Build a surface URL (honouring endpoint overrides) with query parameters.
pub(crate) fn query_url(
    escalator: &Escalator,
    provider: Provider,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Result<Url> {
    let mut url = escalator.endpoint(provider, endpoint)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(css, error = ?e, "invalid selector");
            None
        }
    }
}

/// Resolve an attribute value to an absolute http(s) URL.
///
/// `data:` URIs, fragments-only and non-web schemes are rejected.
pub(crate) fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with("data:") {
        return None;
    }
    let url = base.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Image URLs from `<img>`-like nodes, trying `src`, then `data-src`, then
/// `data-imgurl`. Exact repeats on the page are skipped.
pub(crate) fn collect_img_sources(
    html: &str,
    base: &Url,
    css: &str,
    skip: impl Fn(&str) -> bool,
    limit: usize,
) -> Vec<ExtractedRef> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut urls: Vec<String> = Vec::new();
    for element in document.select(&sel) {
        if urls.len() >= limit {
            break;
        }
        let node = element.value();
        let found = ["src", "data-src", "data-imgurl"]
            .iter()
            .filter_map(|attr| node.attr(attr))
            .find_map(|raw| resolve_url(base, raw));
        let Some(url) = found else {
            continue;
        };
        if skip(&url) || urls.contains(&url) {
            continue;
        }
        urls.push(url);
    }
    urls.into_iter().map(ExtractedRef::ImageUrl).collect()
}

/// Whitespace-normalised text of every node matching `css`.
pub(crate) fn collect_text(html: &str, css: &str, limit: usize) -> Vec<ExtractedRef> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&sel)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .take(limit)
        .map(ExtractedRef::Snippet)
        .collect()
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a JSON payload.
///
/// Browsers wrap raw JSON in `<pre>` when rendering it, so headless
/// payloads are unwrapped first.
pub(crate) fn json_body(payload: &str, mode: FetchMode) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(payload.trim()) {
        return Some(value);
    }
    if !mode.is_headless() {
        return None;
    }
    let sel = selector("pre")?;
    let document = Html::parse_document(payload);
    let text: String = document.select(&sel).next()?.text().collect();
    serde_json::from_str(text.trim()).ok()
}
