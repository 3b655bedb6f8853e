use crate::models::{ChunkingConfig, PageText};
use std::collections::HashSet;

/// Splits text into overlapping chunks sized in words.
///
/// Paragraphs (blank-line separated) are accumulated into a buffer and
/// flushed when the next paragraph would overflow `chunk_size`; a short tail
/// of `overlap / 10` words seeds the next buffer. A paragraph that alone
/// exceeds `chunk_size` is split into word windows of that width advancing
/// by `chunk_size - overlap`. If no paragraph structure produced any chunk,
/// the whole text is window-split the same way.
///
/// The config must satisfy `overlap < chunk_size` (see
/// [`ChunkingConfig::validate`]); otherwise the window stride collapses.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chunk_size = config.chunk_size.max(1);
    let stride = chunk_size.saturating_sub(config.overlap).max(1);

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for paragraph in text.split("\n\n") {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        if words.len() > chunk_size {
            // Flush the buffer before window-splitting the oversized paragraph.
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }
            push_word_windows(&mut chunks, &words, chunk_size, stride);
        } else {
            if current.len() + words.len() > chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));
                let tail = (config.overlap / 10).min(current.len());
                current.drain(..current.len() - tail);
            }
            current.extend(words);
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    // No blank-line structure at all: fall back to flat word windows.
    if chunks.is_empty() {
        let words: Vec<&str> = text.split_whitespace().collect();
        push_word_windows(&mut chunks, &words, chunk_size, stride);
    }

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

fn push_word_windows(chunks: &mut Vec<String>, words: &[&str], width: usize, stride: usize) {
    let mut start = 0;
    while start < words.len() {
        let end = (start + width).min(words.len());
        let window = words[start..end].join(" ");
        if !window.trim().is_empty() {
            chunks.push(window);
        }
        start += stride;
    }
}

/// Attributes a chunk to the page sharing the most words with it. Ties keep
/// the first (lowest-numbered) page seen; documents with no pages fall back
/// to page 1.
pub fn attribute_page(chunk: &str, pages: &[PageText]) -> u32 {
    let chunk_lower = chunk.to_lowercase();
    let chunk_words: HashSet<&str> = chunk_lower.split_whitespace().collect();

    let mut best_page = 1u32;
    let mut best_overlap = 0usize;
    for page in pages {
        let page_lower = page.text.to_lowercase();
        let page_words: HashSet<&str> = page_lower.split_whitespace().collect();
        let overlap = chunk_words.intersection(&page_words).count();
        if overlap > best_overlap {
            best_overlap = overlap;
            best_page = page.number;
        }
    }

    best_page
}
