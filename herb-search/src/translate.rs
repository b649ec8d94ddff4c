//! Translation adapter over an optional external translator.
//!
//! Translation never fails an acquisition: on any problem the original
//! text is kept and the result is marked untranslated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, SearchError};

/// External `translate(text, target) -> text` capability.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Outcome of translating one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// True only if the external translator produced `text`.
    pub translated: bool,
    /// Recoverable failure, if translation fell back to the original.
    pub error: Option<SearchError>,
}

impl Translation {
    fn passthrough(text: &str, error: Option<SearchError>) -> Self {
        Self {
            text: text.to_owned(),
            translated: false,
            error,
        }
    }
}

/// Snippets after translation, with an all-or-nothing flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedBatch {
    pub texts: Vec<String>,
    pub translated: bool,
    pub errors: Vec<SearchError>,
}

/// Wraps an optional [`Translator`] with identity and fallback rules.
#[derive(Clone)]
pub struct TranslationAdapter {
    translator: Option<Arc<dyn Translator>>,
    source_language: String,
}

impl TranslationAdapter {
    pub fn new(translator: Option<Arc<dyn Translator>>, source_language: impl Into<String>) -> Self {
        Self {
            translator,
            source_language: source_language.into(),
        }
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Whether text must go through the translator to reach `target`.
    pub fn needs_translation(&self, target: &str) -> bool {
        !target.trim().eq_ignore_ascii_case(self.source_language.trim())
    }

    /// Translate `text` into `target`.
    ///
    /// Identity, with no external call, when `target` is the source
    /// language.
    pub async fn translate(&self, text: &str, target: &str) -> Translation {
        if !self.needs_translation(target) {
            return Translation::passthrough(text, None);
        }
        let Some(translator) = &self.translator else {
            return Translation::passthrough(
                text,
                Some(SearchError::Translation("no translator configured".into())),
            );
        };

        match translator.translate(text, target.trim()).await {
            Ok(out) if !out.trim().is_empty() => Translation {
                text: out,
                translated: true,
                error: None,
            },
            Ok(_) => Translation::passthrough(
                text,
                Some(SearchError::Translation("translator returned empty text".into())),
            ),
            Err(e) => {
                let error = match e {
                    SearchError::Translation(_) => e,
                    other => SearchError::Translation(other.to_string()),
                };
                Translation::passthrough(text, Some(error))
            }
        }
    }

    /// Translate every text in order.
    ///
    /// `translated` is true only if each text went through the translator.
    pub async fn translate_all(&self, texts: &[String], target: &str) -> TranslatedBatch {
        let mut out = Vec::with_capacity(texts.len());
        let mut errors = Vec::new();
        let mut all_translated = !texts.is_empty();

        for text in texts {
            let translation = self.translate(text, target).await;
            all_translated &= translation.translated;
            if let Some(error) = translation.error {
                errors.push(error);
            }
            out.push(translation.text);
        }

        TranslatedBatch {
            texts: out,
            translated: all_translated,
            errors,
        }
    }
}

impl std::fmt::Debug for TranslationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationAdapter")
            .field("has_translator", &self.translator.is_some())
            .field("source_language", &self.source_language)
            .finish()
    }
}
