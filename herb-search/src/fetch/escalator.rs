//! Escalating fetch: walk a provider's fetch modes until one yields
//! parsable content.
//!
//! Each attempt is classified into a [`FetchOutcome`] and reported to the
//! event sink. A non-success outcome advances to the next mode. A success
//! whose payload parses to nothing also advances, since a rendered page can
//! expose what the raw page did not. The first success with content stops
//! the walk.

use std::sync::Arc;

use url::Url;

use super::{blocked, proxy, PageRenderer, PageRequest};
use crate::config::AcquireConfig;
use crate::error::{Result, SearchError};
use crate::events::{AcquisitionEvent, Reporter};
use crate::http;
use crate::provider::descriptor;
use crate::types::{FetchAttempt, FetchMode, FetchOutcome, Provider};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";
const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Items parsed by the first mode that produced any, plus the attempt log.
#[derive(Debug)]
pub struct Escalated<T> {
    pub items: Vec<T>,
    pub mode: FetchMode,
    pub attempts: Vec<FetchAttempt>,
}

/// Runs fetch attempts for one acquisition.
#[derive(Clone)]
pub struct Escalator {
    config: Arc<AcquireConfig>,
    renderer: Option<Arc<dyn PageRenderer>>,
    reporter: Reporter,
    /// Index into the escalation order of the first mode to try.
    start: usize,
}

impl Escalator {
    pub fn new(
        config: Arc<AcquireConfig>,
        renderer: Option<Arc<dyn PageRenderer>>,
        reporter: Reporter,
    ) -> Self {
        Self {
            config,
            renderer,
            reporter,
            start: 0,
        }
    }

    /// A copy that skips every mode up to and including `mode`.
    ///
    /// Returns `None` when `mode` is the last one in `provider`'s order, or
    /// not in it at all.
    pub fn resume_after(&self, provider: Provider, mode: FetchMode) -> Option<Self> {
        let order = self.escalation_order(provider);
        let next = order.iter().position(|m| *m == mode)? + 1;
        (next < order.len()).then(|| Self {
            start: next,
            ..self.clone()
        })
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.config
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Modes to try for `provider`, honouring configured overrides.
    pub fn escalation_order(&self, provider: Provider) -> Vec<FetchMode> {
        self.config
            .escalation_overrides
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| descriptor(provider).escalation_order.to_vec())
    }

    /// Parse a provider surface URL, rebasing it onto a configured origin.
    ///
    /// The override keeps the surface's path and query, so
    /// `https://www.bing.com/images/search?q=x` with an override of
    /// `http://127.0.0.1:8080/bing` becomes
    /// `http://127.0.0.1:8080/bing/images/search?q=x`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if either URL is invalid.
    pub fn endpoint(&self, provider: Provider, raw: &str) -> Result<Url> {
        let url = Url::parse(raw)
            .map_err(|e| SearchError::Config(format!("invalid endpoint {raw}: {e}")))?;
        let Some(origin) = self.config.endpoint_overrides.get(&provider) else {
            return Ok(url);
        };

        let mut rebased = Url::parse(origin).map_err(|e| {
            SearchError::Config(format!("invalid endpoint override for {provider}: {e}"))
        })?;
        let path = format!("{}{}", rebased.path().trim_end_matches('/'), url.path());
        rebased.set_path(&path);
        rebased.set_query(url.query());
        Ok(rebased)
    }

    /// Run a single attempt and report it.
    pub async fn attempt(
        &self,
        provider: Provider,
        mode: FetchMode,
        request: &PageRequest,
    ) -> FetchAttempt {
        let (outcome, payload) = if mode.is_proxied() && !proxy::probe(&self.config.proxy).await {
            tracing::debug!(%provider, %mode, "proxy unreachable, skipping mode");
            (FetchOutcome::NetworkError, None)
        } else if mode.is_headless() {
            self.render(mode, request).await
        } else {
            self.fetch(mode, request).await
        };

        let (outcome, payload) = match payload {
            Some(body) => match self.denial_marker(provider, &body) {
                Some(marker) => {
                    tracing::debug!(%provider, %mode, marker, "denial page detected");
                    (FetchOutcome::Blocked, None)
                }
                None => (outcome, Some(body)),
            },
            None => (outcome, None),
        };

        self.reporter.emit(AcquisitionEvent::FetchAttempted {
            provider,
            mode,
            url: request.url.to_string(),
            outcome,
        });

        FetchAttempt {
            mode,
            url: request.url.to_string(),
            outcome,
            payload,
        }
    }

    /// Walk the escalation order until `parse` returns something.
    ///
    /// # Errors
    ///
    /// [`SearchError::NoResults`] if some mode answered but nothing parsed,
    /// [`SearchError::ProviderUnavailable`] if no mode answered at all.
    pub async fn escalate<T, F>(
        &self,
        provider: Provider,
        request: &PageRequest,
        mut parse: F,
    ) -> Result<Escalated<T>>
    where
        F: FnMut(&str, FetchMode) -> Vec<T>,
    {
        let order: Vec<FetchMode> = self
            .escalation_order(provider)
            .into_iter()
            .skip(self.start)
            .collect();
        let mut attempts = Vec::with_capacity(order.len());
        let mut responded = false;

        for mode in order {
            let attempt = self.attempt(provider, mode, request).await;
            if let Some(body) = attempt.payload.as_deref() {
                responded = true;
                let items = parse(body, mode);
                attempts.push(attempt);
                if !items.is_empty() {
                    tracing::debug!(%provider, %mode, count = items.len(), "fetch produced content");
                    return Ok(Escalated {
                        items,
                        mode,
                        attempts,
                    });
                }
                tracing::debug!(%provider, %mode, "response held nothing parsable");
                continue;
            }
            attempts.push(attempt);
        }

        if responded {
            Err(SearchError::NoResults(format!(
                "{provider}: responses held no parsable references"
            )))
        } else {
            Err(SearchError::ProviderUnavailable(format!(
                "{provider}: no endpoint responded after {} attempts",
                attempts.len()
            )))
        }
    }

    fn denial_marker<'a>(&'a self, provider: Provider, body: &str) -> Option<&'a str> {
        let builtin = descriptor(provider).denial_markers.iter().copied();
        let extra = self.config.extra_denial_markers.iter().map(String::as_str);
        blocked::find_denial_marker(body, builtin.chain(extra))
    }

    async fn fetch(&self, mode: FetchMode, request: &PageRequest) -> (FetchOutcome, Option<String>) {
        let client = match http::build_client(&self.config, mode) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(%mode, error = %e, "could not build HTTP client");
                return (FetchOutcome::NetworkError, None);
            }
        };

        let accept = if request.expects_json {
            JSON_ACCEPT
        } else {
            HTML_ACCEPT
        };
        let mut builder = client
            .get(request.url.clone())
            .header("Accept", accept)
            .header("Accept-Language", ACCEPT_LANGUAGE);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return (classify(&e), None),
        };
        let status = response.status();
        if !status.is_success() {
            return (FetchOutcome::HttpError(status.as_u16()), None);
        }

        match response.text().await {
            Ok(body) => {
                tracing::trace!(%mode, bytes = body.len(), "response received");
                (FetchOutcome::Success, Some(body))
            }
            Err(e) => (classify(&e), None),
        }
    }

    async fn render(&self, mode: FetchMode, request: &PageRequest) -> (FetchOutcome, Option<String>) {
        let Some(renderer) = &self.renderer else {
            tracing::debug!(%mode, "no page renderer configured");
            return (FetchOutcome::NetworkError, None);
        };

        let proxy = mode.is_proxied().then(|| self.config.proxy.url());
        let rendering = renderer.render_page(request.url.as_str(), proxy.as_deref());
        match tokio::time::timeout(self.config.timeout_for(mode), rendering).await {
            Ok(Ok(html)) => (FetchOutcome::Success, Some(html)),
            Ok(Err(SearchError::Timeout(_))) | Err(_) => (FetchOutcome::Timeout, None),
            Ok(Err(e)) => {
                tracing::debug!(%mode, error = %e, "render failed");
                (FetchOutcome::NetworkError, None)
            }
        }
    }
}

impl std::fmt::Debug for Escalator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Escalator")
            .field("has_renderer", &self.renderer.is_some())
            .field("start", &self.start)
            .field("reporter", &self.reporter)
            .finish()
    }
}

fn classify(error: &reqwest::Error) -> FetchOutcome {
    if error.is_timeout() {
        FetchOutcome::Timeout
    } else {
        FetchOutcome::NetworkError
    }
}
