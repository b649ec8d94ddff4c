//! URL normalisation for image deduplication.
//!
//! Canonicalises image URLs so that the same file referenced with a
//! different query-parameter order, tracking parameters, fragment or host
//! capitalisation is downloaded only once. Pixels are never compared.

use url::Url;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
];

/// Normalise a URL for deduplication comparison.
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Remove default ports.
/// 3. Strip known tracking parameters and sort the rest by key.
/// 4. Remove the fragment.
///
/// If the input cannot be parsed as a URL, it is returned trimmed.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };

    parsed.set_fragment(None);

    if matches!(
        (parsed.scheme(), parsed.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    // Url::parse already lowercases scheme and host.
    parsed.to_string()
}
