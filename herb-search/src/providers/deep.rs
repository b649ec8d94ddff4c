//! Deep search: Google's surfaces, reached only through the SOCKS proxy.

use url::Url;

use super::google;
use crate::error::Result;
use crate::fetch::{Escalator, PageRequest};
use crate::provider::{ProviderDescriptor, SearchProvider, BOTH_CAPABILITIES, PROXIED_ESCALATION};
use crate::types::{Capability, ExtractedRef, FetchMode, Provider};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: Provider::Deep,
    capabilities: BOTH_CAPABILITIES,
    image_endpoint: google::SEARCH_ENDPOINT,
    text_endpoint: google::SEARCH_ENDPOINT,
    escalation_order: PROXIED_ESCALATION,
    denial_markers: google::DENIAL_MARKERS,
    scale_factor: 2.0,
};

/// Proxy-routed Google.
pub struct DeepProvider;

impl SearchProvider for DeepProvider {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn image_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        google::image_request(escalator, Provider::Deep, term)
    }

    fn text_request(&self, escalator: &Escalator, term: &str) -> Result<PageRequest> {
        google::text_request(escalator, Provider::Deep, term)
    }

    fn parse(
        &self,
        surface: Capability,
        payload: &str,
        _mode: FetchMode,
        base: &Url,
        limit: usize,
    ) -> Vec<ExtractedRef> {
        google::parse(surface, payload, base, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_google_surfaces() {
        assert_eq!(DESCRIPTOR.image_endpoint, google::DESCRIPTOR.image_endpoint);
        assert_eq!(DESCRIPTOR.denial_markers, google::DESCRIPTOR.denial_markers);
        assert!(DESCRIPTOR.escalation_order.iter().all(FetchMode::is_proxied));
    }

    #[test]
    fn parses_like_google() {
        let base = Url::parse("https://www.google.com/search?q=x").expect("url");
        let html = r#"<img src="https://encrypted-tbn0.gstatic.com/images?q=tbn:X">"#;
        assert_eq!(
            DeepProvider.parse(Capability::Images, html, FetchMode::ProxiedDirect, &base, 5),
            vec![ExtractedRef::ImageUrl(
                "https://encrypted-tbn0.gstatic.com/images?q=tbn:X".into()
            )]
        );
    }
}
