//! Data types for documents, chunks, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier of the document, normally its file name.
    pub id: String,
    /// The raw text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional path or URI of the original file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach the path or URI the document was loaded from.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// Half-open character range `[start, end)` into a document's cleaned text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A contiguous segment of a [`Document`], optionally carrying its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier built as `{document_id}_{sequence_index}`.
    pub id: String,
    /// The chunk content. Never empty after trimming.
    pub text: String,
    /// Normalised file name of the originating document.
    pub source: String,
    /// Character offsets into the cleaned document text.
    pub span: Span,
    /// Position of this chunk within its document.
    pub sequence_index: usize,
    /// The vector embedding for this chunk's text; empty until indexed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus `chunk_index`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] with the index's distance score.
///
/// `similarity_score` is a distance: lower means closer. Its scale is defined
/// by the vector store and must not be assumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity_score: f32,
    /// Score assigned by the keyword reranker, if it ran. Only meaningful
    /// within a single retrieval call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, similarity_score: f32) -> Self {
        Self { chunk, similarity_score, rerank_score: None }
    }
}
