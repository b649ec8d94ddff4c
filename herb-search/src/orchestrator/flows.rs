//! The text and image flows of one acquisition.
//!
//! Each flow walks the refined query variants, most specific first, and
//! moves on only when a variant produced nothing usable. Flows share no
//! mutable state; both report through the same [`Reporter`].

use super::snippets::{is_long_enough, shape_snippets};
use crate::config::AcquireOptions;
use crate::error::{Result, SearchError};
use crate::events::{AcquisitionEvent, Flow, Reporter};
use crate::fetch::Escalator;
use crate::materialize::Materializer;
use crate::providers;
use crate::translate::TranslationAdapter;
use crate::types::{CandidateImage, FetchMode, Provider};

/// Image references requested per wanted image. Dead links and
/// undecodable files are common, so the materializer gets headroom.
pub const CANDIDATE_HEADROOM: usize = 3;

/// Final output of the text flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOutcome {
    pub snippets: Vec<String>,
    pub translated: bool,
}

/// Tracks why variants failed so the flow reports the right error.
#[derive(Debug, Default)]
struct VariantFailures {
    responded: bool,
    last: Option<SearchError>,
}

impl VariantFailures {
    fn record(&mut self, reporter: &Reporter, flow: Flow, variant: &str, error: SearchError) {
        tracing::debug!(flow = flow.as_str(), error = %error, "variant exhausted");
        tracing::trace!(variant, "exhausted variant");
        if !matches!(error, SearchError::ProviderUnavailable(_)) {
            self.responded = true;
        }
        reporter.emit(AcquisitionEvent::VariantExhausted {
            flow,
            variant: variant.to_owned(),
            error: error.clone(),
        });
        self.last = Some(error);
    }

    /// `ProviderUnavailable` only if no variant ever got a response.
    fn into_error(self, provider: Provider, flow: Flow) -> SearchError {
        match self.last {
            Some(SearchError::ProviderUnavailable(msg)) if !self.responded => {
                SearchError::ProviderUnavailable(msg)
            }
            Some(SearchError::NoResults(msg)) => SearchError::NoResults(msg),
            _ => SearchError::NoResults(format!(
                "{provider}: no {} content for any query variant",
                flow.as_str()
            )),
        }
    }
}

/// Find, shape and translate description snippets.
///
/// # Errors
///
/// [`SearchError::ProviderUnavailable`] or [`SearchError::NoResults`] when
/// every variant came up empty.
pub async fn text_flow(
    escalator: Escalator,
    translation: TranslationAdapter,
    options: AcquireOptions,
    variants: Vec<String>,
) -> Result<TextOutcome> {
    let provider = options.provider;
    let reporter = escalator.reporter().clone();
    let mut failures = VariantFailures::default();

    for variant in &variants {
        let raw = match providers::search_text(provider, &escalator, variant).await {
            Ok(raw) => raw,
            Err(e) => {
                failures.record(&reporter, Flow::Text, variant, e);
                continue;
            }
        };

        let snippets = shape_snippets(raw);
        if snippets.is_empty() {
            let error = SearchError::NoResults(format!("{provider}: no snippet long enough"));
            failures.record(&reporter, Flow::Text, variant, error);
            continue;
        }

        let outcome = translate(&translation, &reporter, snippets, &options).await;
        tracing::debug!(count = outcome.snippets.len(), translated = outcome.translated, "text ready");
        reporter.emit(AcquisitionEvent::TextReady {
            snippets: outcome.snippets.clone(),
            translated: outcome.translated,
        });
        return Ok(outcome);
    }

    let error = failures.into_error(provider, Flow::Text);
    reporter.emit(AcquisitionEvent::FlowFailed {
        flow: Flow::Text,
        error: error.clone(),
    });
    Err(error)
}

async fn translate(
    translation: &TranslationAdapter,
    reporter: &Reporter,
    snippets: Vec<String>,
    options: &AcquireOptions,
) -> TextOutcome {
    let Some(target) = options.target_language.as_deref() else {
        return TextOutcome {
            snippets,
            translated: false,
        };
    };
    if !translation.needs_translation(target) {
        return TextOutcome {
            snippets,
            translated: false,
        };
    }

    let batch = translation.translate_all(&snippets, target).await;
    if let Some(error) = batch.errors.into_iter().next() {
        tracing::warn!(target_language = target, error = %error, "translation fell back to source text");
        reporter.emit(AcquisitionEvent::TranslationFailed { error });
    }
    let mut translated = batch.translated;
    let snippets = snippets
        .into_iter()
        .zip(batch.texts)
        .map(|(source, text)| {
            if is_long_enough(&text) {
                text
            } else {
                tracing::debug!(target_language = target, "translation too short, keeping source text");
                translated = false;
                source
            }
        })
        .collect();
    TextOutcome {
        snippets,
        translated,
    }
}

/// Find and materialize up to `options.image_count` images.
///
/// # Errors
///
/// Same as [`text_flow`].
pub async fn image_flow(
    escalator: Escalator,
    materializer: Materializer,
    options: AcquireOptions,
    variants: Vec<String>,
) -> Result<Vec<CandidateImage>> {
    let provider = options.provider;
    let reporter = escalator.reporter().clone();
    let order = escalator.escalation_order(provider);
    let wanted = options.image_count;
    let mut failures = VariantFailures::default();

    for variant in &variants {
        match variant_images(&escalator, &materializer, provider, variant, wanted, &order).await {
            Ok(images) => {
                tracing::debug!(count = images.len(), "images ready");
                reporter.emit(AcquisitionEvent::ImagesReady {
                    images: images.clone(),
                });
                return Ok(images);
            }
            Err(e) => failures.record(&reporter, Flow::Images, variant, e),
        }
    }

    let error = failures.into_error(provider, Flow::Images);
    reporter.emit(AcquisitionEvent::FlowFailed {
        flow: Flow::Images,
        error: error.clone(),
    });
    Err(error)
}

/// Images for one variant.
///
/// References that all fail to materialize send the search on to the next
/// fetch mode; the variant is exhausted only once every mode is.
async fn variant_images(
    escalator: &Escalator,
    materializer: &Materializer,
    provider: Provider,
    variant: &str,
    wanted: usize,
    order: &[FetchMode],
) -> Result<Vec<CandidateImage>> {
    let mut current = escalator.clone();
    let mut materialized_nothing = false;

    loop {
        let found = match providers::search_images(
            provider,
            &current,
            variant,
            wanted * CANDIDATE_HEADROOM,
        )
        .await
        {
            Ok(found) => found,
            Err(_) if materialized_nothing => break,
            Err(e) => return Err(e),
        };

        let images = materializer.materialize(found.refs, wanted, order).await;
        if !images.is_empty() {
            return Ok(images);
        }
        materialized_nothing = true;
        tracing::debug!(%provider, mode = %found.mode, "no reference materialized, escalating");
        match escalator.resume_after(provider, found.mode) {
            Some(next) => current = next,
            None => break,
        }
    }

    Err(SearchError::NoResults(format!(
        "{provider}: no image could be materialized"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_everywhere_stays_unavailable() {
        let reporter = Reporter::tracing();
        let mut failures = VariantFailures::default();
        failures.record(&reporter, Flow::Text, "a", SearchError::ProviderUnavailable("x".into()));
        failures.record(&reporter, Flow::Text, "b", SearchError::ProviderUnavailable("y".into()));
        assert!(matches!(
            failures.into_error(Provider::Bing, Flow::Text),
            SearchError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn any_response_means_no_results() {
        let reporter = Reporter::tracing();
        let mut failures = VariantFailures::default();
        failures.record(&reporter, Flow::Images, "a", SearchError::NoResults("x".into()));
        failures.record(&reporter, Flow::Images, "b", SearchError::ProviderUnavailable("y".into()));
        assert!(matches!(
            failures.into_error(Provider::Bing, Flow::Images),
            SearchError::NoResults(_)
        ));
    }

    #[test]
    fn no_variants_is_no_results() {
        let failures = VariantFailures::default();
        assert!(matches!(
            failures.into_error(Provider::Google, Flow::Text),
            SearchError::NoResults(_)
        ));
    }
}
