//! Deterministic answer extraction: the fallback used when no generative
//! capability is configured (or when it fails). Three strategies run in
//! order over the retrieved context, first success wins.

use crate::query::{extract_search_terms, TermMatcher};
use regex::Regex;
use std::sync::OnceLock;

/// Substrings that mark a sentence as a definition.
const DEFINITION_MARKERS: [&str; 8] = [
    "is",
    "means",
    "defined as",
    "refers to",
    "is a",
    "are",
    "denotes",
    "called",
];

const MAX_ANSWER_CHARS: usize = 1_000;
const MIN_SENTENCE_CHARS: usize = 20;
const MIN_CLAUSE_CHARS: usize = 15;
/// Paragraph strategy: sentences shorter than this are skipped entirely.
const MIN_PARAGRAPH_SENTENCE_CHARS: usize = 10;
/// Paragraph strategy: stop accumulating once this many chars are collected.
const PARAGRAPH_BUDGET_CHARS: usize = 500;
/// Paragraph strategy: at most this many leading sentences are considered.
const PARAGRAPH_SENTENCE_SLOTS: usize = 3;

pub fn not_found_message(query: &str) -> String {
    format!("I couldn't find specific information about '{query}' in the uploaded documents.")
}

/// A sentence and the punctuation run that closed it. The final sentence of
/// a context without trailing punctuation is closed with ". ".
#[derive(Debug, Clone)]
pub(crate) struct Sentence {
    pub(crate) text: String,
    pub(crate) punctuation: String,
}

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s*").expect("sentence boundary pattern is valid"))
}

fn enumeration_res() -> &'static [Regex; 2] {
    static RES: OnceLock<[Regex; 2]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"^\d+[-.)]\s*").expect("numeric enumeration pattern is valid"),
            Regex::new(r"^[A-Z0-9]+[-.)]\s*").expect("lettered enumeration pattern is valid"),
        ]
    })
}

fn list_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*(?:and\s+)?[aA]n?\s+").expect("list clause pattern is valid"))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n+").expect("paragraph pattern is valid"))
}

pub(crate) fn split_sentences(context: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for boundary in sentence_boundary_re().find_iter(context) {
        let text = context[last..boundary.start()].trim();
        if !text.is_empty() {
            sentences.push(Sentence {
                text: text.to_string(),
                punctuation: boundary.as_str().to_string(),
            });
        }
        last = boundary.end();
    }

    let tail = context[last..].trim();
    if !tail.is_empty() {
        sentences.push(Sentence {
            text: tail.to_string(),
            punctuation: ". ".to_string(),
        });
    }

    sentences
}

/// Removes leading enumeration markers such as "1. " or "A) ".
pub(crate) fn strip_enumeration(text: &str) -> String {
    let mut out = text.trim().to_string();
    for re in enumeration_res() {
        out = re.replace(&out, "").into_owned();
    }
    out
}

fn bounded(answer: &str) -> String {
    answer.trim().chars().take(MAX_ANSWER_CHARS).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Extracts an answer for `query` from the retrieved `context`, running the
/// strategy pipeline in order and returning the first success; a fixed
/// not-found message otherwise.
pub fn extract_answer(query: &str, context: &str) -> String {
    let terms = extract_search_terms(query);
    let Some(primary) = terms.first() else {
        return "I couldn't find specific information about that in the uploaded documents."
            .to_string();
    };
    let matcher = TermMatcher::new(primary);

    let strategies: [fn(&str, &TermMatcher) -> Option<String>; 3] =
        [definition_sentence, any_sentence, paragraph_lead];

    strategies
        .iter()
        .find_map(|strategy| strategy(context, &matcher))
        .unwrap_or_else(|| not_found_message(query))
}

/// Strategy 1: a sentence containing both the primary term and a definition
/// marker. List sentences keep only the clause mentioning the term.
fn definition_sentence(context: &str, matcher: &TermMatcher) -> Option<String> {
    for sentence in split_sentences(context) {
        let lower = sentence.text.to_lowercase();
        if !matcher.matches_phrase(&lower) {
            continue;
        }
        if !DEFINITION_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }

        let mut clean = strip_enumeration(&sentence.text);
        if clean.contains(", ") || clean.contains(" and ") {
            for clause in list_clause_re().split(&clean) {
                let clause_lower = clause.to_lowercase();
                if clause_lower.contains(matcher.term())
                    && DEFINITION_MARKERS
                        .iter()
                        .any(|marker| clause_lower.contains(marker))
                {
                    clean = clause.trim().to_string();
                    break;
                }
            }
        }

        if char_len(&clean) > MIN_SENTENCE_CHARS {
            return Some(bounded(&format!("{}{}", clean, sentence.punctuation)));
        }
    }
    None
}

/// Strategy 2: any sufficiently long sentence containing the primary term,
/// definition marker or not.
fn any_sentence(context: &str, matcher: &TermMatcher) -> Option<String> {
    for sentence in split_sentences(context) {
        let lower = sentence.text.to_lowercase();
        if !matcher.matches_phrase(&lower) {
            continue;
        }
        if char_len(&sentence.text) <= MIN_SENTENCE_CHARS {
            continue;
        }

        let mut clean = strip_enumeration(&sentence.text);
        if clean.contains(", ") {
            for clause in list_clause_re().split(&clean) {
                if clause.to_lowercase().contains(matcher.term())
                    && char_len(clause.trim()) > MIN_CLAUSE_CHARS
                {
                    clean = clause.trim().to_string();
                    break;
                }
            }
        }

        return Some(bounded(&format!("{}{}", clean, sentence.punctuation)));
    }
    None
}

/// Strategy 3: the leading sentences of the first paragraph mentioning the
/// primary term, up to a character budget.
fn paragraph_lead(context: &str, matcher: &TermMatcher) -> Option<String> {
    for paragraph in paragraph_re().split(context) {
        if !paragraph.to_lowercase().contains(matcher.term()) {
            continue;
        }

        let mut collected = String::new();
        for sentence in split_sentences(paragraph)
            .iter()
            .take(PARAGRAPH_SENTENCE_SLOTS)
        {
            if char_len(&sentence.text) > MIN_PARAGRAPH_SENTENCE_CHARS {
                collected.push_str(&sentence.text);
                collected.push_str(&sentence.punctuation);
                if char_len(&collected) > PARAGRAPH_BUDGET_CHARS {
                    break;
                }
            }
        }

        if !collected.is_empty() {
            return Some(bounded(&strip_enumeration(&collected)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH_CONTEXT: &str = "A complete graph is a graph in which every pair of vertices \
         is connected. A tree is a graph with no cycles.";

    #[test]
    fn definition_sentence_beats_other_definitions() {
        let answer = extract_answer("what is a complete graph", GRAPH_CONTEXT);
        assert!(answer.contains("complete graph"));
        assert!(answer.contains("every pair of vertices"));
        assert!(!answer.contains("no cycles"));
    }

    #[test]
    fn single_word_terms_require_whole_word_sentences() {
        let context = "Sympathy is a feeling that people share. A path is a sequence of edges.";
        let answer = extract_answer("define path", context);
        assert!(answer.contains("sequence of edges"));
        assert!(!answer.contains("Sympathy"));
    }

    #[test]
    fn list_sentences_keep_only_the_matching_clause() {
        let context = "A cycle is a closed walk, a complete graph is a graph with all edges present, and a tree is an acyclic graph.";
        let answer = extract_answer("what is a complete graph", context);
        assert!(answer.contains("complete graph is a graph with all edges present"));
        assert!(!answer.contains("closed walk"));
    }

    #[test]
    fn sentences_without_definition_markers_still_match_strategy_two() {
        // No definition-marker substring anywhere in the sentence.
        let context = "The bipartite structure kept showing up during the second run.";
        let answer = extract_answer("explain bipartite", context);
        assert!(answer.contains("second run"));
    }

    #[test]
    fn paragraph_strategy_collects_leading_sentences() {
        // Sentences mentioning the term are too short for strategies 1 and
        // 2, so the paragraph strategy answers.
        let context =
            "Unrelated paragraph about nothing in particular here.\n\nAn octree helps. It splits space into eight parts recursively always. Every level refines the previous one further down.";
        let answer = extract_answer("tell me about octree", context);
        assert!(answer.contains("splits space into eight parts"));
    }

    #[test]
    fn enumeration_markers_are_stripped() {
        let context = "1. A complete graph is a graph in which every pair of vertices is connected.";
        let answer = extract_answer("what is a complete graph", context);
        assert!(answer.starts_with("A complete graph"));
    }

    #[test]
    fn missing_term_returns_the_fixed_not_found_message() {
        let answer = extract_answer("what is a dodecahedron", GRAPH_CONTEXT);
        assert_eq!(answer, not_found_message("what is a dodecahedron"));
        assert!(answer.contains("dodecahedron"));
    }

    #[test]
    fn answers_are_capped_at_one_thousand_chars() {
        let long_tail = "x".repeat(2_000);
        let context = format!("A complete graph is a graph where {long_tail}.");
        let answer = extract_answer("what is a complete graph", &context);
        assert!(answer.chars().count() <= 1_000);
    }

    #[test]
    fn sentences_split_on_retained_punctuation() {
        let sentences = split_sentences("First one. Second one! Third one");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].text, "First one");
        assert_eq!(sentences[0].punctuation, ". ");
        assert_eq!(sentences[1].punctuation, "! ");
        assert_eq!(sentences[2].punctuation, ". ");
    }

    #[test]
    fn enumeration_stripping_handles_both_marker_shapes() {
        assert_eq!(strip_enumeration("1. A graph"), "A graph");
        assert_eq!(strip_enumeration("A) A graph"), "A graph");
        assert_eq!(strip_enumeration("plain sentence"), "plain sentence");
    }
}
