//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is used in tests and
//! as the working set of [`DirectoryVectorStore`](crate::DirectoryVectorStore).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, nearest};

/// Collection name → chunk ID → chunk.
pub(crate) type Collections = HashMap<String, HashMap<String, Chunk>>;

/// An in-memory vector store using cosine distance for search.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("policy_docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<Collections>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_collections(collections: Collections) -> Self {
        Self { collections: RwLock::new(collections) }
    }

    /// Clone the full contents, e.g. for persistence.
    pub(crate) async fn snapshot(&self) -> Collections {
        self.collections.read().await.clone()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(RagError::VectorStoreError {
                    backend: "InMemory".to_string(),
                    message: format!("chunk '{}' has no embedding", chunk.id),
                });
            }
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(nearest(store.values(), embedding, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(HashMap::len).ok_or_else(|| missing(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Span;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: id.to_string(),
            source: "policy.md".to_string(),
            span: Span { start: 0, end: id.len() },
            sequence_index: 0,
            embedding,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn search_returns_nearest_first() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        let chunks = [
            chunk("east", vec![1.0, 0.0]),
            chunk("north", vec![0.0, 1.0]),
            chunk("ne", vec![1.0, 1.0]),
        ];
        store.upsert("docs", &chunks).await.unwrap();

        let results = store.search("docs", &[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "ne"]);
        assert!(results[0].similarity_score <= results[1].similarity_score);
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", &[1.0], 3).await.is_err());
        assert!(store.count("nope").await.is_err());
    }

    #[tokio::test]
    async fn empty_collection_returns_no_results() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        assert!(store.search("docs", &[1.0, 0.0], 3).await.unwrap().is_empty());
        assert_eq!(store.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_requires_embeddings() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        assert!(store.upsert("docs", &[chunk("bare", Vec::new())]).await.is_err());
    }
}
