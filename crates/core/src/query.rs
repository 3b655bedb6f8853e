use regex::Regex;
use std::sync::OnceLock;

/// Exact substring corrections for frequent query typos.
const TYPO_FIXES: [(&str, &str); 8] = [
    ("deifne", "define"),
    ("defien", "define"),
    ("waht", "what"),
    ("whate", "what"),
    ("grapgh", "graph"),
    ("grahph", "graph"),
    ("comlete", "complete"),
    ("complte", "complete"),
];

/// Question words, articles, and auxiliaries removed before ranking terms.
const STOP_WORDS: [&str; 19] = [
    "define", "what", "is", "are", "tell", "me", "about", "explain", "describe", "how", "why",
    "when", "where", "can", "you", "please", "the", "a", "an",
];

fn stop_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(define|what|is|are|tell|me|about|explain|describe|please|the|a|an)\b")
            .expect("stop-phrase pattern is valid")
    })
}

/// Normalizes a question into ranked candidate search terms.
///
/// The full surviving phrase comes first when two or more words remain,
/// followed by each individual word. Downstream consumers treat the first
/// element as the primary term, so this ordering is significant. Never
/// returns an empty list: when nothing survives stop-word removal the
/// lowered query itself is the sole term.
pub fn extract_search_terms(query: &str) -> Vec<String> {
    let mut lowered = query.to_lowercase().trim().to_string();
    for (typo, fix) in TYPO_FIXES {
        lowered = lowered.replace(typo, fix);
    }
    let lowered = lowered
        .trim_end_matches(['?', '!', '.'])
        .trim()
        .to_string();

    let mut words: Vec<String> = lowered
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word) && word.len() > 1)
        .map(str::to_string)
        .collect();

    if words.is_empty() {
        let stripped = stop_phrase_re().replace_all(&lowered, "");
        words = stripped
            .split_whitespace()
            .filter(|word| word.len() > 1)
            .map(str::to_string)
            .collect();
    }

    if words.is_empty() {
        return vec![lowered];
    }

    let mut terms = Vec::with_capacity(words.len() + 1);
    if words.len() >= 2 {
        terms.push(words.join(" "));
    }
    terms.extend(words);
    terms
}

/// Containment rules for a primary term: whole-word match for single words,
/// exact phrase or all constituent words for multi-word terms.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    term: String,
    words: Vec<String>,
}

impl TermMatcher {
    pub fn new(term: &str) -> Self {
        let term = term.to_lowercase();
        let words = term.split_whitespace().map(str::to_string).collect();
        Self { term, words }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Loose containment: phrase or all constituent words (used by chunk
    /// selection).
    pub fn matches(&self, text_lower: &str) -> bool {
        if self.words.len() <= 1 {
            contains_whole_word(text_lower, &self.term)
        } else {
            text_lower.contains(&self.term)
                || self.words.iter().all(|word| text_lower.contains(word.as_str()))
        }
    }

    /// Strict containment: the phrase itself must appear (used by sentence
    /// extraction).
    pub fn matches_phrase(&self, text_lower: &str) -> bool {
        if self.words.len() <= 1 {
            contains_whole_word(text_lower, &self.term)
        } else {
            text_lower.contains(&self.term)
        }
    }
}

/// Whole-word containment: every occurrence boundary-checked against word
/// characters (alphanumeric or underscore), so "path" does not match
/// "sympathy". Also accepts multi-word needles, boundary-checked at the
/// phrase edges.
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, matched)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let after_ok = haystack[start + matched.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
