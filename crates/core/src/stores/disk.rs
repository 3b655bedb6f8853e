use crate::error::StoreError;
use crate::models::{SearchHit, StoredChunk};
use crate::traits::VectorStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// File name of the single logical collection inside the data directory.
pub const COLLECTION_FILE: &str = "documents.json";

/// Brute-force similarity store persisted as a JSON file. Appends rewrite
/// the file; queries scan all chunks and rank by L2 distance. Good for the
/// corpus sizes this engine targets; swap in a remote index behind
/// [`VectorStore`] when that stops being true.
pub struct DiskVectorStore {
    path: Option<PathBuf>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl DiskVectorStore {
    /// Opens (or creates) the collection under `data_dir`, loading any
    /// previously persisted chunks.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(COLLECTION_FILE);

        let chunks = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            chunks: RwLock::new(chunks),
        })
    }

    /// Volatile store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn persist(&self, chunks: &[StoredChunk]) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            std::fs::write(path, serde_json::to_string(chunks)?)?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for DiskVectorStore {
    async fn add(&self, chunks: Vec<StoredChunk>) -> Result<(), StoreError> {
        let mut guard = self.chunks.write().await;
        guard.extend(chunks);
        self.persist(&guard)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let guard = self.chunks.read().await;
        let mut hits: Vec<SearchHit> = guard
            .iter()
            .map(|chunk| SearchHit {
                text: chunk.text.clone(),
                distance: l2_distance(vector, &chunk.embedding),
            })
            .collect();

        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.read().await.len())
    }

    async fn all(&self) -> Result<Vec<StoredChunk>, StoreError> {
        Ok(self.chunks.read().await.clone())
    }
}

/// Euclidean distance. Vectors of mismatched dimensions (mixed providers)
/// sort last rather than erroring.
fn l2_distance(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return f32::INFINITY;
    }
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}
