//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] sequences the build-time workflow
//! (chunk → embed → store) and the query-time workflow
//! (retrieve → rerank → format) by composing an [`EmbeddingProvider`], a
//! [`VectorStore`], a [`Chunker`] and a [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_rag::{RagPipeline, RagConfig, InMemoryVectorStore, HashingEmbeddingProvider};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.build_index(&documents).await?;
//! let context = pipeline.query("How long do refunds take?").await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::{Chunker, StructuralChunker};
use crate::config::RagConfig;
use crate::context::RankedContext;
use crate::document::{Chunk, Document, ScoredChunk};
use crate::embedding::{EmbeddingProvider, check_dimensions};
use crate::error::{RagError, Result};
use crate::reranker::{KeywordOverlapReranker, Reranker};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// Outcome of a full index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub document_count: usize,
    pub chunk_count: usize,
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
///
/// The pipeline keeps no state between queries; it can be shared behind an
/// `Arc` and called concurrently.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    reranker: Arc<dyn Reranker>,
    retriever: Retriever,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return the retriever used for queries.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Rebuild the configured collection from scratch out of `documents`.
    ///
    /// The collection is dropped and recreated, every document is chunked,
    /// embedded and stored, and the store is flushed. An empty corpus yields an
    /// empty collection, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if two documents share an id, or if
    /// the store or the embedding provider fails, naming the document involved.
    pub async fn build_index(&self, documents: &[Document]) -> Result<IndexSummary> {
        let collection = self.config.collection.as_str();
        let dimensions = self.embedding_provider.dimensions();

        let mut seen = HashSet::with_capacity(documents.len());
        if let Some(duplicate) = documents.iter().find(|d| !seen.insert(d.id.as_str())) {
            let message = format!("duplicate document id '{}'", duplicate.id);
            return Err(RagError::PipelineError(message));
        }

        self.vector_store.delete_collection(collection).await.map_err(|e| {
            error!(collection, error = %e, "failed to drop collection");
            RagError::PipelineError(format!("failed to drop collection '{collection}': {e}"))
        })?;
        self.vector_store.create_collection(collection, dimensions).await.map_err(|e| {
            error!(collection, error = %e, "failed to create collection");
            RagError::PipelineError(format!("failed to create collection '{collection}': {e}"))
        })?;

        let mut summary = IndexSummary::default();
        for document in documents {
            let chunks = self.ingest(document).await?;
            summary.document_count += 1;
            summary.chunk_count += chunks.len();
        }

        self.vector_store.flush().await.map_err(|e| {
            error!(collection, error = %e, "failed to persist collection");
            RagError::PipelineError(format!("failed to persist collection '{collection}': {e}"))
        })?;

        info!(
            collection,
            document_count = summary.document_count,
            chunk_count = summary.chunk_count,
            "index built"
        );
        Ok(summary)
    }

    /// Ingest a single document into the configured collection: chunk → embed → store.
    ///
    /// Returns the chunks that were stored (with embeddings attached).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails,
    /// including the document ID in the error message.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let collection = self.config.collection.as_str();

        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            RagError::PipelineError(format!(
                "embedding failed for document '{}': {e}",
                document.id
            ))
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::PipelineError(format!(
                "embedding provider returned {} vectors for {} chunks of document '{}'",
                embeddings.len(),
                chunks.len(),
                document.id
            )));
        }
        check_dimensions(self.embedding_provider.as_ref(), &embeddings).map_err(|e| {
            RagError::PipelineError(format!("bad embeddings for document '{}': {e}", document.id))
        })?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(collection, &chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            RagError::PipelineError(format!("upsert failed for document '{}': {e}", document.id))
        })?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Retrieve and, if enabled, rerank chunks for `query`.
    ///
    /// With `use_reranking` off the retriever's order is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if retrieval fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let results = self.retriever.retrieve(query).await?;
        if self.config.use_reranking {
            Ok(self.reranker.rerank(query, results))
        } else {
            Ok(results)
        }
    }

    /// Query the pipeline: retrieve → rerank → format.
    ///
    /// Zero retrieved chunks produce an empty [`RankedContext`].
    pub async fn query(&self, query: &str) -> Result<RankedContext> {
        let ranked = RankedContext::from(self.retrieve(query).await?);
        info!(
            result_count = ranked.chunks.len(),
            sources = ?ranked.source_list,
            reranked = self.config.use_reranking,
            "query completed"
        );
        Ok(ranked)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The chunker
/// defaults to a [`StructuralChunker`] sized from the config and the reranker
/// to [`KeywordOverlapReranker`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the reranker used when `use_reranking` is on.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(StructuralChunker::from_config(&config)?),
        };
        let reranker = self.reranker.unwrap_or_else(|| Arc::new(KeywordOverlapReranker));

        let retriever = Retriever::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_store),
            config.collection.clone(),
            config.top_k,
        );

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker, reranker, retriever })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::hashing::HashingEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;

    /// Advertises more dimensions than it returns.
    struct Misreporting;

    #[async_trait]
    impl EmbeddingProvider for Misreporting {
        fn name(&self) -> &str {
            "Misreporting"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    #[test]
    fn builder_requires_components() {
        let err = RagPipeline::builder().config(RagConfig::default()).build().err().unwrap();
        assert!(err.to_string().contains("embedding_provider"));

        let err = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("vector_store"));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = RagConfig { chunk_overlap: 500, ..RagConfig::default() };
        let result = RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn ingest_rejects_mismatched_dimensions() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(Misreporting))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();

        let err = pipeline
            .build_index(&[Document::new("a.md", "Refunds take a week.")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::PipelineError(_)));
        assert!(err.to_string().contains("a.md"));
    }

    #[tokio::test]
    async fn duplicate_document_ids_are_rejected_before_the_store_is_touched() {
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
            .vector_store(store.clone())
            .build()
            .unwrap();
        pipeline.build_index(&[Document::new("policy.md", "Refunds take a week.")]).await.unwrap();

        let err = pipeline
            .build_index(&[
                Document::new("policy.md", "Refunds take a week."),
                Document::new("policy.md", "Orders ship in two days."),
            ])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate document id 'policy.md'"));
        assert_eq!(store.count("policy_docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reranking_annotates_results() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();
        pipeline
            .build_index(&[
                Document::new("refund_policy.md", "Refunds take 7-10 business days."),
                Document::new("shipping_policy.md", "Orders ship in two days."),
            ])
            .await
            .unwrap();

        let results = pipeline.retrieve("refunds take").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "refund_policy.md");
        assert!(results.iter().all(|r| r.rerank_score.is_some()));
    }
}
