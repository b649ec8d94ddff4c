//! TOML configuration for the herbview host.
//!
//! Every section is optional; missing keys take their defaults. The file is
//! translated into a [`herb_search::AcquireConfig`] for the pipeline and
//! default [`herb_search::AcquireOptions`] for callers that omit them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use herb_search::{AcquireConfig, AcquireOptions, FetchMode, Provider, ProxySettings};
use serde::{Deserialize, Serialize};

use crate::error::{HerbViewError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HerbViewConfig {
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub proxy: ProxyConfig,
    pub headless: HeadlessConfig,
    pub translation: TranslationConfig,
}

/// Per-call defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: Provider,
    pub image_count: usize,
    /// Language snippets are translated into when the caller names none.
    pub target_language: Option<String>,
    /// Language the providers answer in.
    pub source_language: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            image_count: 4,
            target_language: None,
            source_language: "en".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub direct_timeout_seconds: u64,
    pub extended_timeout_seconds: u64,
    /// Fixed User-Agent. Rotates through a built-in list when unset.
    pub user_agent: Option<String>,
    pub thumbnail_max: u32,
    pub max_image_bytes: usize,
    pub download_concurrency: usize,
    /// Extra denial-page markers applied to every provider.
    pub denial_markers: Vec<String>,
    /// Escalation order per provider name, e.g. `bing = ["direct"]`.
    pub escalation: HashMap<String, Vec<FetchMode>>,
    /// Origin per provider name, e.g. `qwant = "http://127.0.0.1:8080"`.
    pub endpoints: HashMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = AcquireConfig::default();
        Self {
            direct_timeout_seconds: defaults.direct_timeout_seconds,
            extended_timeout_seconds: defaults.extended_timeout_seconds,
            user_agent: None,
            thumbnail_max: defaults.thumbnail_max,
            max_image_bytes: defaults.max_image_bytes,
            download_concurrency: defaults.download_concurrency,
            denial_markers: Vec::new(),
            escalation: HashMap::new(),
            endpoints: HashMap::new(),
        }
    }
}

/// External SOCKS proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub probe_timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let defaults = ProxySettings::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            probe_timeout_ms: defaults.probe_timeout_ms,
        }
    }
}

/// Headless browser for the rendering fetch modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Only honoured when built with the `headless` feature.
    pub enabled: bool,
    /// Chromium executable. Discovered on `PATH` when unset.
    pub chromium_path: Option<PathBuf>,
}

/// LibreTranslate-compatible translation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:5000".to_owned(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

impl HerbViewConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HerbViewError::Config(e.to_string()))
    }

    /// Load from `path`, or from the default location if it exists, or
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit or existing file cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Self::default_config_path();
        if default_path.exists() {
            tracing::debug!(path = %default_path.display(), "loading default config");
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HerbViewError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/herbview/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("herbview")
            .join("config.toml")
    }

    /// Build the pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HerbViewError::Config`] for an unknown provider name in
    /// `[fetch.escalation]` or `[fetch.endpoints]`, or when the resulting
    /// pipeline configuration is invalid.
    pub fn to_acquire_config(&self) -> Result<AcquireConfig> {
        let config = AcquireConfig {
            direct_timeout_seconds: self.fetch.direct_timeout_seconds,
            extended_timeout_seconds: self.fetch.extended_timeout_seconds,
            proxy: ProxySettings {
                host: self.proxy.host.clone(),
                port: self.proxy.port,
                probe_timeout_ms: self.proxy.probe_timeout_ms,
            },
            user_agent: self.fetch.user_agent.clone(),
            thumbnail_max: self.fetch.thumbnail_max,
            max_image_bytes: self.fetch.max_image_bytes,
            download_concurrency: self.fetch.download_concurrency,
            source_language: self.search.source_language.clone(),
            extra_denial_markers: self.fetch.denial_markers.clone(),
            endpoint_overrides: keyed_by_provider(&self.fetch.endpoints, "endpoints")?,
            escalation_overrides: keyed_by_provider(&self.fetch.escalation, "escalation")?,
        };
        config
            .validate()
            .map_err(|e| HerbViewError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Options used when a caller does not specify them.
    pub fn default_options(&self) -> AcquireOptions {
        AcquireOptions {
            provider: self.search.provider,
            image_count: self.search.image_count,
            target_language: self.search.target_language.clone(),
        }
    }
}

fn keyed_by_provider<V: Clone>(
    table: &HashMap<String, V>,
    section: &str,
) -> Result<HashMap<Provider, V>> {
    table
        .iter()
        .map(|(name, value)| {
            Provider::parse(name)
                .map(|provider| (provider, value.clone()))
                .ok_or_else(|| {
                    HerbViewError::Config(format!("unknown provider `{name}` in [fetch.{section}]"))
                })
        })
        .collect()
}
