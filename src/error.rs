//! Error types for the herbview host.

use herb_search::SearchError;

/// Top-level error type for the host application.
#[derive(Debug, thiserror::Error)]
pub enum HerbViewError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Content acquisition failed.
    #[error("acquisition error: {0}")]
    Search(#[from] SearchError),

    /// Translation service error.
    #[error("translation error: {0}")]
    Translation(String),

    /// Host command routing error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HerbViewError>;
