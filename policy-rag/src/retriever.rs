//! Nearest-neighbour retrieval over the policy index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::ScoredChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Fetches the `top_k` chunks nearest to a query.
///
/// Results come back in the store's native order (ascending distance). An
/// empty query is not an error; whatever the store returns for it is passed
/// through. Every failure below this layer surfaces as
/// [`RagError::IndexUnavailable`] and is never retried here.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self { embedding_provider, vector_store, collection: collection.into(), top_k }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `top_k` chunks for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the query cannot be embedded
    /// or the vector store cannot serve the search.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let collection = self.collection.as_str();

        let embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(collection, error = %e, "query embedding failed");
            RagError::index_unavailable(collection, format!("query embedding failed: {e}"))
        })?;

        let results =
            self.vector_store.search(collection, &embedding, self.top_k).await.map_err(|e| {
                error!(collection, error = %e, "vector store search failed");
                RagError::index_unavailable(collection, e.to_string())
            })?;

        debug!(collection, top_k = self.top_k, result_count = results.len(), "retrieved chunks");
        Ok(results)
    }
}
