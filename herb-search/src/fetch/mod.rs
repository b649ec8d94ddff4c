//! Fetch layer: escalating strategies from plain HTTP to headless
//! rendering to proxy-routed requests.

pub mod blocked;
pub mod escalator;
pub mod proxy;
pub mod renderer;

pub use escalator::{Escalated, Escalator};
pub use renderer::PageRenderer;

use url::Url;

/// A single GET request against a provider surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: Url,
    /// Extra request headers (e.g. `Referer` for token-guarded APIs).
    pub headers: Vec<(&'static str, String)>,
    /// Whether the surface answers with JSON rather than HTML.
    pub expects_json: bool,
}

impl PageRequest {
    pub fn html(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
            expects_json: false,
        }
    }

    pub fn json(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
            expects_json: true,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}
