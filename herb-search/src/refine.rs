//! Query refinement: most specific variant first, bare query last.

use crate::types::Query;

/// Produce the ordered list of query variants to try.
///
/// Each refinement hint yields `"{base} {hint}"`; the bare base text is
/// always the final fallback. Pure and deterministic. An empty base yields
/// no variants; duplicate variants collapse.
pub fn refine(query: &Query) -> Vec<String> {
    let base = query.raw_text();
    if base.is_empty() {
        return Vec::new();
    }

    let mut variants: Vec<String> = Vec::with_capacity(query.refinement_hints().len() + 1);
    for hint in query.refinement_hints() {
        let hint = hint.trim();
        if hint.is_empty() {
            continue;
        }
        push_unique(&mut variants, format!("{base} {hint}"));
    }
    push_unique(&mut variants, base.to_owned());
    variants
}

fn push_unique(variants: &mut Vec<String>, candidate: String) {
    if !variants.contains(&candidate) {
        variants.push(candidate);
    }
}
