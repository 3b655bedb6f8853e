use crate::error::StoreError;
use crate::models::{SearchHit, StoredChunk};
use async_trait::async_trait;

/// Persistent similarity index over chunk vectors. The core only ever
/// appends; no update or delete is required.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends chunks to the single logical collection.
    async fn add(&self, chunks: Vec<StoredChunk>) -> Result<(), StoreError>;

    /// Returns the `k` nearest neighbors ascending by distance. An empty
    /// store yields an empty result, not an error.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Every stored chunk with metadata; used for page reconstruction.
    async fn all(&self) -> Result<Vec<StoredChunk>, StoreError>;
}
