//! Image materialization: download, decode, deduplicate and normalize.
//!
//! Every candidate is downloaded with the provider's first HTTP-capable
//! fetch mode and no escalation. Failed downloads and undecodable bodies
//! drop only that candidate. Output keeps first-seen order.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::AcquireConfig;
use crate::error::{Result, SearchError};
use crate::fetch::proxy;
use crate::http;
use crate::provider::descriptor;
use crate::types::{CandidateImage, FetchMode, ImageRef, Provider};
use crate::url_normalize::normalize_url;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/png,image/*;q=0.8,*/*;q=0.5";

/// Drop references whose normalized URL was already seen.
pub fn dedup_refs(refs: Vec<ImageRef>) -> Vec<ImageRef> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|r| seen.insert(normalize_url(&r.url)))
        .collect()
}

/// The mode image downloads use: the first non-headless mode in `order`.
pub fn download_mode(order: &[FetchMode]) -> FetchMode {
    order
        .iter()
        .copied()
        .find(|mode| !mode.is_headless())
        .unwrap_or(if order.iter().all(FetchMode::is_proxied) {
            FetchMode::ProxiedDirect
        } else {
            FetchMode::Direct
        })
}

/// Fit within `max`×`max` (never upscaling), then apply `scale`.
///
/// Each side is at least one pixel.
pub fn normalize(image: DynamicImage, max: u32, scale: f32) -> DynamicImage {
    let bounded = if image.width() > max || image.height() > max {
        image.resize(max, max, FilterType::Lanczos3)
    } else {
        image
    };

    if (scale - 1.0).abs() < f32::EPSILON {
        return bounded;
    }
    let width = scaled_side(bounded.width(), scale);
    let height = scaled_side(bounded.height(), scale);
    bounded.resize_exact(width, height, FilterType::Lanczos3)
}

fn scaled_side(side: u32, scale: f32) -> u32 {
    let scaled = (f64::from(side) * f64::from(scale)).round();
    if scaled < 1.0 {
        1
    } else if scaled > f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Decode raw bytes and normalize for display.
///
/// # Errors
///
/// Returns [`SearchError::Decode`] if the bytes are not a supported image.
pub fn decode_candidate(
    source_url: String,
    raw_bytes: Vec<u8>,
    provider: Provider,
    thumbnail_max: u32,
) -> Result<CandidateImage> {
    let decoded = image::load_from_memory(&raw_bytes)
        .map_err(|e| SearchError::Decode(format!("{source_url}: {e}")))?;
    let decoded_dimensions = (decoded.width(), decoded.height());
    let image = normalize(decoded, thumbnail_max, descriptor(provider).scale_factor);
    Ok(CandidateImage {
        source_url,
        raw_bytes,
        decoded_dimensions,
        provider,
        image,
    })
}

/// Turns image references into decoded, display-ready candidates.
#[derive(Debug, Clone)]
pub struct Materializer {
    config: Arc<AcquireConfig>,
}

impl Materializer {
    pub fn new(config: Arc<AcquireConfig>) -> Self {
        Self { config }
    }

    /// Materialize up to `count` images from `refs`, in first-seen order.
    ///
    /// `order` is the provider's escalation order; it selects the download
    /// mode. An empty result is valid.
    pub async fn materialize(
        &self,
        refs: Vec<ImageRef>,
        count: usize,
        order: &[FetchMode],
    ) -> Vec<CandidateImage> {
        let refs = dedup_refs(refs);
        if refs.is_empty() || count == 0 {
            return Vec::new();
        }

        let mode = download_mode(order);
        if mode.is_proxied() && !proxy::probe(&self.config.proxy).await {
            tracing::warn!(%mode, "proxy unreachable, no images downloaded");
            return Vec::new();
        }
        let client = match http::build_client(&self.config, mode) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "image client unavailable");
                return Vec::new();
            }
        };

        tracing::debug!(candidates = refs.len(), count, %mode, "materializing images");
        let mut downloads = stream::iter(refs)
            .map(|image_ref| self.fetch_candidate(&client, image_ref))
            .buffered(self.config.download_concurrency.max(1));

        let mut images = Vec::with_capacity(count);
        while let Some(result) = downloads.next().await {
            match result {
                Ok(candidate) => {
                    images.push(candidate);
                    if images.len() >= count {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "image candidate dropped"),
            }
        }
        tracing::debug!(count = images.len(), "images materialized");
        images
    }

    async fn fetch_candidate(
        &self,
        client: &reqwest::Client,
        image_ref: ImageRef,
    ) -> Result<CandidateImage> {
        let limit = self.config.max_image_bytes;
        let response = client
            .get(&image_ref.url)
            .header("Accept", IMAGE_ACCEPT)
            .send()
            .await
            .map_err(|e| download_error(&image_ref.url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Network(format!(
                "{}: HTTP {}",
                image_ref.url,
                status.as_u16()
            )));
        }
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(SearchError::Decode(format!(
                "{}: larger than {limit} bytes",
                image_ref.url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(&image_ref.url, &e))?;
        if bytes.len() > limit {
            return Err(SearchError::Decode(format!(
                "{}: larger than {limit} bytes",
                image_ref.url
            )));
        }

        let thumbnail_max = self.config.thumbnail_max;
        let ImageRef { url, provider } = image_ref;
        tokio::task::spawn_blocking(move || {
            decode_candidate(url, bytes.to_vec(), provider, thumbnail_max)
        })
        .await
        .map_err(|e| SearchError::Decode(format!("decode task failed: {e}")))?
    }
}

fn download_error(url: &str, error: &reqwest::Error) -> SearchError {
    if error.is_timeout() {
        SearchError::Timeout(format!("{url}: {error}"))
    } else {
        SearchError::Network(format!("{url}: {error}"))
    }
}
