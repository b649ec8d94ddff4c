//! Acquisition configuration with sensible defaults.
//!
//! [`AcquireConfig`] is process-wide: timeouts, proxy location, image
//! normalization bounds and per-provider overrides. [`AcquireOptions`] is
//! per call: which provider, how many images, which language.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::SearchError;
use crate::types::{FetchMode, Provider};

/// Upper bound for [`AcquireOptions::image_count`].
pub const MAX_IMAGE_COUNT: usize = 20;

/// Location of the external SOCKS proxy used by the proxied fetch modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    /// How long a reachability probe may take before the proxy is
    /// considered down.
    pub probe_timeout_ms: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 9050,
            probe_timeout_ms: 1500,
        }
    }
}

impl ProxySettings {
    /// Routing URL handed to the HTTP client. `socks5h` resolves DNS
    /// on the proxy side.
    pub fn url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

/// Process-wide configuration for the acquisition pipeline.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Timeout for [`FetchMode::Direct`] attempts and direct image downloads.
    pub direct_timeout_seconds: u64,
    /// Timeout for proxied and headless attempts.
    pub extended_timeout_seconds: u64,
    pub proxy: ProxySettings,
    /// Custom User-Agent string. If `None`, rotates through a built-in list.
    pub user_agent: Option<String>,
    /// Bounding box (both sides) for the thumbnail transform.
    pub thumbnail_max: u32,
    /// Image bodies larger than this are dropped.
    pub max_image_bytes: usize,
    /// How many image downloads may overlap. Result order is unaffected.
    pub download_concurrency: usize,
    /// Language the providers answer in; translation to it is a no-op.
    pub source_language: String,
    /// Denial markers appended to every provider's built-in list.
    pub extra_denial_markers: Vec<String>,
    /// Replacement origins (`scheme://host:port`) per provider.
    pub endpoint_overrides: HashMap<Provider, String>,
    /// Replacement escalation orders per provider.
    pub escalation_overrides: HashMap<Provider, Vec<FetchMode>>,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            direct_timeout_seconds: 10,
            extended_timeout_seconds: 20,
            proxy: ProxySettings::default(),
            user_agent: None,
            thumbnail_max: 1200,
            max_image_bytes: 10 * 1024 * 1024,
            download_concurrency: 4,
            source_language: "en".to_owned(),
            extra_denial_markers: Vec::new(),
            endpoint_overrides: HashMap::new(),
            escalation_overrides: HashMap::new(),
        }
    }
}

impl AcquireConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.direct_timeout_seconds == 0 || self.extended_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeouts must be greater than 0".into(),
            ));
        }
        if self.thumbnail_max == 0 {
            return Err(SearchError::Config(
                "thumbnail_max must be greater than 0".into(),
            ));
        }
        if self.download_concurrency == 0 {
            return Err(SearchError::Config(
                "download_concurrency must be greater than 0".into(),
            ));
        }
        if self.source_language.trim().is_empty() {
            return Err(SearchError::Config(
                "source_language must not be empty".into(),
            ));
        }
        if let Some((provider, _)) = self
            .escalation_overrides
            .iter()
            .find(|(_, modes)| modes.is_empty())
        {
            return Err(SearchError::Config(format!(
                "escalation order for {provider} must not be empty"
            )));
        }
        Ok(())
    }

    /// Per-attempt timeout for a fetch mode.
    pub fn timeout_for(&self, mode: FetchMode) -> Duration {
        match mode {
            FetchMode::Direct => Duration::from_secs(self.direct_timeout_seconds),
            FetchMode::HeadlessBrowser
            | FetchMode::ProxiedDirect
            | FetchMode::ProxiedHeadlessBrowser => {
                Duration::from_secs(self.extended_timeout_seconds)
            }
        }
    }
}

/// Per-call options chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOptions {
    pub provider: Provider,
    /// Maximum number of images in the result.
    pub image_count: usize,
    /// Language to translate snippets into; `None` keeps the source language.
    pub target_language: Option<String>,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            image_count: 4,
            target_language: None,
        }
    }
}

impl AcquireOptions {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.image_count == 0 || self.image_count > MAX_IMAGE_COUNT {
            return Err(SearchError::Config(format!(
                "image_count must be between 1 and {MAX_IMAGE_COUNT}"
            )));
        }
        if let Some(lang) = &self.target_language {
            if lang.trim().is_empty() {
                return Err(SearchError::Config(
                    "target_language must not be blank".into(),
                ));
            }
        }
        Ok(())
    }
}
