use crate::pages::PageIndex;
use crate::traits::VectorStore;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Resolved target of a page-directed question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget {
    Number(u32),
    Last,
    First,
}

fn explicit_page_res() -> &'static [Regex; 2] {
    static RES: OnceLock<[Regex; 2]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"what\s+(?:is|are)\s+on\s+page\s+(\d+)")
                .expect("explicit page pattern is valid"),
            Regex::new(r"what'?s\s+on\s+page\s+(\d+)").expect("contracted page pattern is valid"),
        ]
    })
}

fn last_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last\s+page").expect("last page pattern is valid"))
}

fn first_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"first\s+page").expect("first page pattern is valid"))
}

fn bare_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"page\s+(\d+)").expect("bare page pattern is valid"))
}

/// Detects page-directed intent. Patterns are checked in priority order and
/// the first match wins. Expects a lower-cased query.
pub fn detect_page_target(query_lower: &str) -> Option<PageTarget> {
    for re in explicit_page_res() {
        if let Some(captures) = re.captures(query_lower) {
            return captures[1].parse().ok().map(PageTarget::Number);
        }
    }
    if last_page_re().is_match(query_lower) {
        return Some(PageTarget::Last);
    }
    if first_page_re().is_match(query_lower) {
        return Some(PageTarget::First);
    }
    if let Some(captures) = bare_page_re().captures(query_lower) {
        return captures[1].parse().ok().map(PageTarget::Number);
    }
    None
}

/// Serves page-directed questions straight from the Page Index, falling back
/// to reconstruction from vector-store metadata when the index has no entry
/// (e.g. after a restart).
///
/// Returns `(answer, matched)`. Once `matched` is true the caller must not
/// fall through to generic retrieval: page intent is an explicit request,
/// not a relevance hint. An empty answer with `matched == false` means no
/// page intent was detected (or the store is empty).
pub async fn handle_page_query(
    query_lower: &str,
    pages: &PageIndex,
    store: &dyn VectorStore,
) -> (String, bool) {
    let Some(target) = detect_page_target(query_lower) else {
        return (String::new(), false);
    };

    let stored = match store.all().await {
        Ok(stored) => stored,
        Err(error) => {
            warn!(%error, "page reconstruction scan failed");
            return (String::new(), false);
        }
    };
    if stored.is_empty() {
        return (String::new(), false);
    }

    // Multi-document disambiguation is out of scope: the first document id
    // discovered in the store is used.
    let document_id = stored[0].document_id.clone();

    let page_number = match target {
        PageTarget::Number(number) => number,
        PageTarget::First => 1,
        PageTarget::Last => {
            let max = stored.iter().map(|chunk| chunk.page_number).max().unwrap_or(0);
            if max == 0 {
                return (
                    "Could not determine the last page. Please re-upload the document."
                        .to_string(),
                    true,
                );
            }
            max
        }
    };

    // Authoritative source: the page index.
    if let Some(text) = pages.page(&document_id, page_number).await {
        let total = pages.page_count(&document_id).await;
        return (
            format!("**Page {page_number} of {total}:**\n\n{}", text.trim()),
            true,
        );
    }

    // Secondary: reconstruct the page from chunk metadata.
    let parts: Vec<&str> = stored
        .iter()
        .filter(|chunk| chunk.page_number == page_number)
        .map(|chunk| chunk.text.as_str())
        .collect();
    let page_text = parts.join("\n\n").trim().to_string();

    if !page_text.is_empty() {
        let total = stored
            .iter()
            .map(|chunk| chunk.page_number)
            .max()
            .unwrap_or(1)
            .max(1);
        return (
            format!("**Page {page_number} of {total}:**\n\n{page_text}"),
            true,
        );
    }

    (
        format!(
            "Page {page_number} content not found. The document may not have page information stored. Please re-upload the document."
        ),
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageText, StoredChunk};
    use crate::stores::DiskVectorStore;
    use chrono::Utc;

    fn chunk(document_id: &str, page: u32, text: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: format!("{document_id}-{page}-{text}"),
            document_id: document_id.to_string(),
            filename: "doc.pdf".to_string(),
            chunk_index: 0,
            page_number: page,
            text: text.to_string(),
            embedding: vec![0.0; 4],
            uploaded_at: Utc::now(),
        }
    }

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    #[test]
    fn intent_patterns_match_in_priority_order() {
        assert_eq!(
            detect_page_target("what is on page 3"),
            Some(PageTarget::Number(3))
        );
        assert_eq!(
            detect_page_target("what's on page 12"),
            Some(PageTarget::Number(12))
        );
        assert_eq!(detect_page_target("show me the last page"), Some(PageTarget::Last));
        assert_eq!(detect_page_target("first page please"), Some(PageTarget::First));
        assert_eq!(detect_page_target("page 7"), Some(PageTarget::Number(7)));
        assert_eq!(detect_page_target("what is a graph"), None);
    }

    #[test]
    fn explicit_page_number_outranks_the_last_page_pattern() {
        assert_eq!(
            detect_page_target("what is on page 2 versus the last page"),
            Some(PageTarget::Number(2))
        );
    }

    #[tokio::test]
    async fn indexed_page_is_served_with_total_count() {
        let store = DiskVectorStore::in_memory();
        store.add(vec![chunk("doc-1", 1, "chunk text")]).await.expect("add");

        let pages = PageIndex::new();
        pages
            .insert(
                "doc-1",
                vec![page(1, "one"), page(2, "two"), page(3, "three")],
            )
            .await;

        let (answer, matched) = handle_page_query("what is on page 2", &pages, &store).await;
        assert!(matched);
        assert_eq!(answer, "**Page 2 of 3:**\n\ntwo");
    }

    #[tokio::test]
    async fn last_page_resolves_to_the_maximum_page_number() {
        let store = DiskVectorStore::in_memory();
        store
            .add(vec![
                chunk("doc-1", 1, "alpha"),
                chunk("doc-1", 3, "omega"),
            ])
            .await
            .expect("add");

        let pages = PageIndex::new();
        pages
            .insert(
                "doc-1",
                vec![page(1, "alpha"), page(2, "beta"), page(3, "omega page")],
            )
            .await;

        let (answer, matched) = handle_page_query("give me the last page", &pages, &store).await;
        assert!(matched);
        assert_eq!(answer, "**Page 3 of 3:**\n\nomega page");
    }

    #[tokio::test]
    async fn lost_index_degrades_to_metadata_reconstruction() {
        let store = DiskVectorStore::in_memory();
        store
            .add(vec![
                chunk("doc-1", 1, "page one text"),
                chunk("doc-1", 2, "first half"),
                chunk("doc-1", 2, "second half"),
            ])
            .await
            .expect("add");

        // Empty index simulates a restart that lost in-process state.
        let pages = PageIndex::new();

        let (answer, matched) = handle_page_query("what is on page 2", &pages, &store).await;
        assert!(matched);
        assert_eq!(answer, "**Page 2 of 2:**\n\nfirst half\n\nsecond half");
    }

    #[tokio::test]
    async fn matched_intent_with_missing_page_reports_not_found() {
        let store = DiskVectorStore::in_memory();
        store.add(vec![chunk("doc-1", 1, "only page")]).await.expect("add");
        let pages = PageIndex::new();

        let (answer, matched) = handle_page_query("what is on page 9", &pages, &store).await;
        assert!(matched);
        assert!(answer.starts_with("Page 9 content not found"));
    }

    #[tokio::test]
    async fn empty_store_means_no_page_match() {
        let store = DiskVectorStore::in_memory();
        let pages = PageIndex::new();

        let (answer, matched) = handle_page_query("what is on page 1", &pages, &store).await;
        assert!(!matched);
        assert!(answer.is_empty());
    }

    #[tokio::test]
    async fn non_page_queries_do_not_match() {
        let store = DiskVectorStore::in_memory();
        store.add(vec![chunk("doc-1", 1, "text")]).await.expect("add");
        let pages = PageIndex::new();

        let (answer, matched) = handle_page_query("what is a tree", &pages, &store).await;
        assert!(!matched);
        assert!(answer.is_empty());
    }
}
