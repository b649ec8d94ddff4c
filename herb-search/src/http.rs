//! Shared HTTP client construction with User-Agent rotation.
//!
//! Direct modes get a plain client; proxied modes get a client that routes
//! every request through the configured SOCKS endpoint.

use crate::config::AcquireConfig;
use crate::error::SearchError;
use crate::types::FetchMode;
use rand::seq::SliceRandom;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for one fetch mode.
///
/// The client has a cookie store (consent pages), the mode's timeout, a
/// rotated or configured User-Agent and, for proxied modes, the SOCKS
/// proxy. Headless modes never use this client for page loads but the
/// materializer may still ask for one to download images.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the proxy URL is invalid and
/// [`SearchError::Network`] if the client cannot be constructed.
pub fn build_client(
    config: &AcquireConfig,
    mode: FetchMode,
) -> Result<reqwest::Client, SearchError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    let mut builder = reqwest::Client::builder()
        .cookie_store(true)
        .timeout(config.timeout_for(mode))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10));

    builder = if mode.is_proxied() {
        let proxy = reqwest::Proxy::all(config.proxy.url())
            .map_err(|e| SearchError::Config(format!("invalid proxy URL: {e}")))?;
        builder.proxy(proxy)
    } else {
        builder.no_proxy()
    };

    builder
        .build()
        .map_err(|e| SearchError::Network(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // SAFETY: USER_AGENTS is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}
