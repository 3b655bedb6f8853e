pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod pagequery;
pub mod pages;
pub mod query;
pub mod retrieval;
pub mod stores;
pub mod traits;

pub use chunking::{attribute_page, chunk_text};
pub use embeddings::{
    Embedder, EmbeddingProvider, HashEmbedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, ProviderError, StoreError};
pub use extract::extract_answer;
pub use extractor::extract_pages;
pub use generation::{Generator, OpenAiGenerator};
pub use ingest::{discover_document_files, DocumentIngestor, IngestionReport, SkippedDocument};
pub use models::{ChunkingConfig, PageText, QueryResponse, SearchHit, StoredChunk};
pub use orchestrator::ChatEngine;
pub use pagequery::{detect_page_target, PageTarget};
pub use pages::PageIndex;
pub use query::extract_search_terms;
pub use retrieval::{search_documents, select_best_chunks};
pub use stores::DiskVectorStore;
pub use traits::VectorStore;
