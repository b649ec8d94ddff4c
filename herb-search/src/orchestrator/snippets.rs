//! Snippet shaping: normalise, deduplicate, filter and cap raw text.

use crate::providers::normalize_whitespace;

/// Most snippets kept per acquisition.
pub const MAX_SNIPPETS: usize = 5;

/// Snippets must have more than this many words.
pub const MIN_SNIPPET_WORDS: usize = 5;

/// Shape raw provider text into display snippets.
///
/// Whitespace is collapsed, exact duplicates are dropped, snippets of
/// [`MIN_SNIPPET_WORDS`] words or fewer are discarded, and at most
/// [`MAX_SNIPPETS`] remain. Parse order is preserved.
pub fn shape_snippets<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut shaped: Vec<String> = Vec::with_capacity(MAX_SNIPPETS);
    for text in raw {
        let text = normalize_whitespace(&text);
        if !is_long_enough(&text) || shaped.contains(&text) {
            continue;
        }
        shaped.push(text);
        if shaped.len() == MAX_SNIPPETS {
            break;
        }
    }
    shaped
}

/// Whether `text` has more than [`MIN_SNIPPET_WORDS`] whitespace-separated words.
pub fn is_long_enough(text: &str) -> bool {
    text.split_whitespace().count() > MIN_SNIPPET_WORDS
}
