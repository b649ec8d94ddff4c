//! Error types for the herb-search crate.
//!
//! Only [`SearchError::ProviderUnavailable`] and [`SearchError::NoResults`]
//! ever reach a caller of [`crate::acquire`]. The remaining variants
//! describe per-attempt or per-candidate conditions that the pipeline
//! absorbs, logs, and reports through the event sink.

/// Errors that can occur while acquiring content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// No endpoint responded after the full escalation sequence.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider responded but yielded zero parsable references.
    #[error("no results: {0}")]
    NoResults(String),

    /// An anti-automation denial page was served instead of content.
    #[error("blocked: {0}")]
    Blocked(String),

    /// A request exceeded its per-mode timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Transport-level failure (connection refused, proxy down, renderer missing).
    #[error("network error: {0}")]
    Network(String),

    /// A downloaded image could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The external translation capability failed.
    #[error("translation error: {0}")]
    Translation(String),

    /// Invalid acquisition configuration or options.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Whether this error may be reported to the caller as a terminal failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::NoResults(_))
    }

    /// Stable snake_case identifier for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::NoResults(_) => "no_results",
            Self::Blocked(_) => "blocked",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network_error",
            Self::Decode(_) => "decode_error",
            Self::Translation(_) => "translation_error",
            Self::Config(_) => "config_error",
        }
    }
}

/// Convenience type alias for herb-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
