use crate::embeddings::EmbeddingProvider;
use crate::models::SearchHit;
use crate::query::{extract_search_terms, TermMatcher};
use crate::traits::VectorStore;
use std::collections::HashSet;
use tracing::warn;

/// Hard cap on the neighbor over-fetch issued to the store.
const OVERFETCH_CAP: usize = 20;
/// Selection returns at most this many chunks.
const SELECTION_CAP: usize = 10;
/// Slots reserved for the highest-scoring exact matches.
const EXACT_MATCH_CAP: usize = 5;

/// Domain terms that signal a list-style chunk defining several concepts at
/// once; two or more of them dilute the chunk's focus.
const COMPETING_TERMS: [&str; 5] = ["complete graph", "bipartite", "cycle", "tree", "path"];

/// Embeds the query and returns up to `n_results` neighbors ascending by
/// distance. Over-fetches `min(2 * n_results, 20)` to give re-ranking room.
/// Provider and store failures degrade to an empty result, never an error.
pub async fn search_documents(
    embedder: &EmbeddingProvider,
    store: &dyn VectorStore,
    query: &str,
    n_results: usize,
) -> Vec<SearchHit> {
    let vector = match embedder.embed(query).await {
        Ok(vector) => vector,
        Err(error) => {
            warn!(%error, "query embedding failed, returning no results");
            return Vec::new();
        }
    };

    let fetch = (n_results * 2).min(OVERFETCH_CAP);
    let mut hits = match store.query(&vector, fetch).await {
        Ok(hits) => hits,
        Err(error) => {
            warn!(%error, "vector store query failed, returning no results");
            return Vec::new();
        }
    };

    hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
    hits.truncate(n_results);
    hits
}

/// Re-ranks retrieved chunks against the query's primary term.
///
/// Chunks containing the primary term are scored (+20 when the term is
/// immediately followed by a definition verb, plus a distance bonus, minus a
/// list-dilution penalty) and returned first, highest score first, capped at
/// five. Remaining slots up to ten fill from the rest of the containing set
/// and then from the other chunks in original relevance order, skipping
/// duplicates. The sort is stable, so re-running on an already-ordered set
/// preserves order.
pub fn select_best_chunks(query: &str, results: &[SearchHit]) -> Vec<String> {
    let terms = extract_search_terms(query);
    let Some(primary) = terms.first() else {
        return results
            .iter()
            .take(SELECTION_CAP)
            .map(|hit| hit.text.clone())
            .collect();
    };
    let matcher = TermMatcher::new(primary);

    let mut exact: Vec<(f32, &SearchHit)> = Vec::new();
    let mut others: Vec<&SearchHit> = Vec::new();

    for hit in results {
        let text_lower = hit.text.to_lowercase();
        if matcher.matches(&text_lower) {
            exact.push((score_chunk(&text_lower, &matcher, hit.distance), hit));
        } else {
            others.push(hit);
        }
    }

    // Stable: ties keep their original relevance order.
    exact.sort_by(|left, right| right.0.total_cmp(&left.0));

    let mut selected: Vec<String> = exact
        .iter()
        .take(EXACT_MATCH_CAP)
        .map(|(_, hit)| hit.text.clone())
        .collect();

    for (_, hit) in exact.iter().skip(EXACT_MATCH_CAP) {
        if selected.len() >= SELECTION_CAP {
            break;
        }
        if !selected.contains(&hit.text) {
            selected.push(hit.text.clone());
        }
    }

    for hit in &others {
        if selected.len() >= SELECTION_CAP {
            break;
        }
        if !selected.contains(&hit.text) {
            selected.push(hit.text.clone());
        }
    }

    if selected.is_empty() {
        return results
            .iter()
            .take(SELECTION_CAP)
            .map(|hit| hit.text.clone())
            .collect();
    }
    selected
}

fn score_chunk(text_lower: &str, matcher: &TermMatcher, distance: f32) -> f32 {
    let mut score = 0.0;
    if definition_follows(text_lower, matcher.term()) {
        score += 20.0;
    }
    score += (10.0 - distance * 10.0).max(0.0);

    let primary_words: HashSet<&str> = matcher.words().iter().map(String::as_str).collect();
    let dilution = COMPETING_TERMS
        .iter()
        .filter(|term| text_lower.contains(*term) && !primary_words.contains(*term))
        .count();
    if dilution >= 2 {
        score -= 5.0;
    }

    score
}

/// True when the term occurs as a whole word immediately followed by a
/// definition verb (is/means/defined/refers).
fn definition_follows(text_lower: &str, term: &str) -> bool {
    const DEFINITION_VERBS: [&str; 4] = ["is", "means", "defined", "refers"];

    text_lower.match_indices(term).any(|(start, matched)| {
        let boundary_before = text_lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_');
        if !boundary_before {
            return false;
        }

        let after = &text_lower[start + matched.len()..];
        if !after.starts_with(char::is_whitespace) {
            return false;
        }
        let rest = after.trim_start();
        DEFINITION_VERBS.iter().any(|verb| rest.starts_with(verb))
    })
}
