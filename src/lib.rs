//! herbview: back end of a desktop herb and remedy viewer.
//!
//! Given an herb name, a disease or free text, the viewer shows a short
//! description and a handful of representative images. Acquisition itself
//! lives in the `herb-search` crate; this crate hosts it:
//!
//! - **Config**: TOML file mapped onto the pipeline configuration
//! - **Translation**: LibreTranslate-compatible HTTP translator
//! - **Host bridge**: newline-delimited JSON commands and events over
//!   stdin/stdout for a presentation layer (`herbview-host`)
//! - **CLI**: one-shot acquisition printing snippets and saving images (`herbview`)

pub mod config;
pub mod error;
pub mod host;
pub mod service;
pub mod translation;

pub use config::HerbViewConfig;
pub use error::{HerbViewError, Result};
pub use service::{AcquisitionHandler, ContentService, build_orchestrator};
pub use translation::LibreTranslateClient;
