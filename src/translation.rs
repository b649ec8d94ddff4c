//! HTTP translator for LibreTranslate-compatible services.
//!
//! Sends `POST {endpoint}/translate` with a JSON body and reads
//! `translatedText` from the response.

use std::time::Duration;

use async_trait::async_trait;
use herb_search::{SearchError, Translator};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::TranslationConfig;
use crate::error::{HerbViewError, Result};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Translator backed by a LibreTranslate HTTP endpoint.
#[derive(Debug, Clone)]
pub struct LibreTranslateClient {
    client: reqwest::Client,
    url: Url,
    api_key: Option<String>,
    source_language: String,
}

impl LibreTranslateClient {
    /// # Errors
    ///
    /// Returns [`HerbViewError::Config`] if the endpoint is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn new(config: &TranslationConfig, source_language: &str) -> Result<Self> {
        let raw = format!("{}/translate", config.endpoint.trim_end_matches('/'));
        let url = Url::parse(&raw).map_err(|e| {
            HerbViewError::Config(format!("invalid translation endpoint `{}`: {e}", config.endpoint))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| HerbViewError::Config(format!("translation client: {e}")))?;
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            source_language: source_language.to_owned(),
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, target_language: &str) -> herb_search::Result<String> {
        let body = TranslateRequest {
            q: text,
            source: &self.source_language,
            target: target_language,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Translation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .map(|e| e.error)
                .unwrap_or(body_text);
            return Err(SearchError::Translation(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Translation(format!("invalid response: {e}")))?;
        Ok(parsed.translated_text)
    }
}
