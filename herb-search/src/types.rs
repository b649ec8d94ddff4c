//! Core types for queries, providers, fetch attempts and acquired content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported search providers.
///
/// `Deep` reuses Google's surfaces but sends every request through the
/// anonymizing SOCKS proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// General web engine; primary source for both text and images.
    #[default]
    Google,
    /// Bing image and web search.
    Bing,
    /// DuckDuckGo: token bootstrap followed by a JSON image API.
    DuckDuckGo,
    /// Qwant JSON APIs.
    Qwant,
    /// Baidu image and web search.
    Baidu,
    /// Yandex image and web search.
    Yandex,
    /// Google surfaces routed through the SOCKS proxy only.
    Deep,
}

impl Provider {
    /// Returns the human-readable name of this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Bing => "Bing",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Qwant => "Qwant",
            Self::Baidu => "Baidu",
            Self::Yandex => "Yandex",
            Self::Deep => "Deep",
        }
    }

    /// Returns all provider variants in registry order.
    pub fn all() -> &'static [Provider] {
        &[
            Self::Google,
            Self::Bing,
            Self::DuckDuckGo,
            Self::Qwant,
            Self::Baidu,
            Self::Yandex,
            Self::Deep,
        ]
    }

    /// Parse a provider name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "bing" => Some(Self::Bing),
            "duckduckgo" | "ddg" => Some(Self::DuckDuckGo),
            "qwant" => Some(Self::Qwant),
            "baidu" => Some(Self::Baidu),
            "yandex" => Some(Self::Yandex),
            "deep" | "tor" => Some(Self::Deep),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    TextSnippets,
    Images,
}

/// How a query should be biased before it is sent to a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// An herb or remedy name.
    #[default]
    Subject,
    /// A disease, symptom or use.
    Indication,
    /// Arbitrary text, sent as-is.
    FreeText,
}

impl SearchType {
    /// Domain suffix appended by the query refiner.
    pub fn domain_suffix(&self) -> &'static str {
        match self {
            Self::Subject => "herb plant photo",
            Self::Indication => "remedy natural medicine",
            Self::FreeText => "",
        }
    }

    /// Parse a search type from user input.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "subject" | "herb" | "remedy" => Some(Self::Subject),
            "indication" | "disease" | "use" | "uses" => Some(Self::Indication),
            "free_text" | "free-text" | "freetext" | "text" => Some(Self::FreeText),
            _ => None,
        }
    }
}

/// A user query. Created per user action and discarded when acquisition ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    raw_text: String,
    search_type: SearchType,
    refinement_hints: Vec<String>,
}

impl Query {
    /// Build a query; refinement hints are derived from the search type.
    pub fn new(raw_text: impl Into<String>, search_type: SearchType) -> Self {
        let suffix = search_type.domain_suffix();
        let refinement_hints = if suffix.is_empty() {
            Vec::new()
        } else {
            vec![suffix.to_owned()]
        };
        Self {
            raw_text: raw_text.into().trim().to_owned(),
            search_type,
            refinement_hints,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn refinement_hints(&self) -> &[String] {
        &self.refinement_hints
    }
}

/// Strategy used for a single fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Direct,
    HeadlessBrowser,
    ProxiedDirect,
    ProxiedHeadlessBrowser,
}

impl FetchMode {
    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::ProxiedDirect | Self::ProxiedHeadlessBrowser)
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, Self::HeadlessBrowser | Self::ProxiedHeadlessBrowser)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::HeadlessBrowser => "headless_browser",
            Self::ProxiedDirect => "proxied_direct",
            Self::ProxiedHeadlessBrowser => "proxied_headless_browser",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    HttpError(u16),
    Blocked,
    Timeout,
    NetworkError,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::HttpError(code) => write!(f, "http_error({code})"),
            Self::Blocked => f.write_str("blocked"),
            Self::Timeout => f.write_str("timeout"),
            Self::NetworkError => f.write_str("network_error"),
        }
    }
}

/// One step of an escalation sequence. Never persisted.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub mode: FetchMode,
    pub url: String,
    pub outcome: FetchOutcome,
    /// Raw HTML/JSON body; only present on `Success`.
    pub payload: Option<String>,
}

/// A reference pulled out of a provider payload by a parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedRef {
    Snippet(String),
    ImageUrl(String),
}

/// An extracted image URL awaiting materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub provider: Provider,
}

/// A downloaded, decoded and size-normalized image.
#[derive(Clone)]
pub struct CandidateImage {
    /// URL the image was downloaded from.
    pub source_url: String,
    /// Bytes exactly as served.
    pub raw_bytes: Vec<u8>,
    /// Width and height of the decoded original.
    pub decoded_dimensions: (u32, u32),
    /// Provider whose parser produced the URL.
    pub provider: Provider,
    /// The normalized raster ready for display.
    pub image: image::DynamicImage,
}

impl CandidateImage {
    /// Dimensions of the normalized raster.
    pub fn display_dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Encode the normalized raster as PNG.
    pub fn encode_png(&self) -> crate::Result<Vec<u8>> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| crate::SearchError::Decode(format!("PNG encode failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

impl fmt::Debug for CandidateImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateImage")
            .field("source_url", &self.source_url)
            .field("raw_bytes", &self.raw_bytes.len())
            .field("decoded_dimensions", &self.decoded_dimensions)
            .field("display_dimensions", &self.display_dimensions())
            .field("provider", &self.provider)
            .finish()
    }
}

/// Terminal value of one acquisition.
#[derive(Debug, Clone)]
pub struct AcquisitionResult {
    pub snippets: Vec<String>,
    pub images: Vec<CandidateImage>,
    pub provider_used: Provider,
    /// True only when every snippet actually went through the translator.
    pub translated: bool,
    pub target_language: Option<String>,
}
