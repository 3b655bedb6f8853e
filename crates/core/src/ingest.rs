use crate::chunking::{attribute_page, chunk_text};
use crate::embeddings::EmbeddingProvider;
use crate::error::IngestError;
use crate::extractor::extract_pages;
use crate::models::{ChunkingConfig, StoredChunk};
use crate::pages::PageIndex;
use crate::traits::VectorStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Recursively lists the supported document files under `folder`, sorted for
/// deterministic ingestion order.
pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub document_ids: Vec<String>,
    pub skipped_files: Vec<SkippedDocument>,
}

/// Turns documents into embedded, page-attributed chunks and writes them to
/// the vector store and the page index.
pub struct DocumentIngestor<S: VectorStore> {
    store: Arc<S>,
    pages: Arc<PageIndex>,
    embedder: Arc<EmbeddingProvider>,
    config: ChunkingConfig,
}

impl<S: VectorStore> DocumentIngestor<S> {
    pub fn new(
        store: Arc<S>,
        pages: Arc<PageIndex>,
        embedder: Arc<EmbeddingProvider>,
        config: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            pages,
            embedder,
            config,
        }
    }

    /// Ingests a single document and returns its generated id.
    pub async fn ingest_file(&self, path: &Path) -> Result<String, IngestError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
            })?
            .to_string();

        self.config.validate()?;

        let pages = extract_pages(path)?;
        let full_text = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if full_text.trim().is_empty() {
            return Err(IngestError::EmptyDocument(filename));
        }

        let document_id = Uuid::new_v4().to_string();
        let uploaded_at = Utc::now();

        let mut chunks = Vec::new();
        for (index, text) in chunk_text(&full_text, self.config).into_iter().enumerate() {
            let embedding = self.embedder.embed(&text).await?;
            let page_number = attribute_page(&text, &pages);

            chunks.push(StoredChunk {
                chunk_id: make_chunk_id(&document_id, index, &text),
                document_id: document_id.clone(),
                filename: filename.clone(),
                chunk_index: index,
                page_number,
                text,
                embedding,
                uploaded_at,
            });
        }

        let chunk_count = chunks.len();
        let page_count = pages.len();
        self.pages.insert(&document_id, pages).await;
        self.store.add(chunks).await?;

        info!(
            document_id = %document_id,
            filename = %filename,
            chunks = chunk_count,
            pages = page_count,
            "document ingested"
        );
        Ok(document_id)
    }

    /// Ingests every supported document under `folder`, best effort. Files
    /// that fail are reported, not fatal. Errors when the folder holds no
    /// supported documents at all.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestError> {
        let files = discover_document_files(folder);

        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no document files found in {}",
                folder.display()
            )));
        }

        let mut document_ids = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            match self.ingest_file(&path).await {
                Ok(document_id) => document_ids.push(document_id),
                Err(error) => skipped_files.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(IngestionReport {
            document_ids,
            skipped_files,
        })
    }
}

fn make_chunk_id(document_id: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
