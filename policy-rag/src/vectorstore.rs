//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, ScoredChunk};
use crate::error::Result;

/// A storage backend for chunk embeddings with nearest-neighbour search.
///
/// Implementations manage named collections of [`Chunk`]s. Search results
/// carry a *distance* in [`ScoredChunk::similarity_score`]: lower is closer,
/// and results are returned best-first (ascending distance).
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("policy_docs", 384).await?;
/// store.upsert("policy_docs", &chunks).await?;
/// let nearest = store.search("policy_docs", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it is absent.
    ///
    /// Persistent stores may defer the on-disk removal to [`flush`](Self::flush).
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` chunks nearest to `embedding`, ascending distance.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Persist pending writes. Stores without durable state do nothing.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns `1.0` if either vector has zero magnitude or the lengths differ.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Rank `chunks` by cosine distance to `embedding` and keep the `top_k` nearest.
///
/// Equal distances are ordered by chunk id so results are reproducible.
pub(crate) fn nearest<'a>(
    chunks: impl Iterator<Item = &'a Chunk>,
    embedding: &[f32],
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .map(|chunk| ScoredChunk::new(chunk.clone(), cosine_distance(&chunk.embedding, embedding)))
        .collect();

    scored.sort_by(|a, b| {
        a.similarity_score
            .total_cmp(&b.similarity_score)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    scored.truncate(top_k);
    scored
}
