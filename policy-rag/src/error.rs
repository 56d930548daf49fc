//! Error types for the `policy-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing, retrieving, or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The vector index cannot be reached, has no such collection, or the
    /// query could not be turned into a vector.
    #[error("Index unavailable ({collection}): {message}")]
    IndexUnavailable {
        /// The collection that was queried.
        collection: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A generation strategy failed to produce an answer.
    #[error("Generation error ({generator}): {message}")]
    GenerationError {
        /// The generator (or chain) that produced the error.
        generator: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error. Raised before any chunking or
    /// retrieval is attempted.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the build-time pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem access failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A persisted index or report could not be (de)serialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Build an [`RagError::IndexUnavailable`] for `collection`.
    pub fn index_unavailable(collection: &str, message: impl Into<String>) -> Self {
        Self::IndexUnavailable { collection: collection.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
