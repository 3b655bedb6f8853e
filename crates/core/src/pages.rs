use crate::models::PageText;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-lifetime page store keyed by document id. Authoritative for
/// exact page lookups; not persisted across restarts, in which case page
/// queries degrade to reconstruction from vector-store metadata.
#[derive(Default)]
pub struct PageIndex {
    pages: RwLock<HashMap<String, Vec<PageText>>>,
}

impl PageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, document_id: &str, pages: Vec<PageText>) {
        self.pages
            .write()
            .await
            .insert(document_id.to_string(), pages);
    }

    /// Full text of page `number`, or `None` when the document or page is
    /// unknown.
    pub async fn page(&self, document_id: &str, number: u32) -> Option<String> {
        self.pages
            .read()
            .await
            .get(document_id)?
            .iter()
            .find(|page| page.number == number)
            .map(|page| page.text.clone())
    }

    pub async fn page_count(&self, document_id: &str) -> usize {
        self.pages
            .read()
            .await
            .get(document_id)
            .map(|pages| pages.len())
            .unwrap_or(0)
    }
}
