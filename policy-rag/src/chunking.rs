//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`StructuralChunker`], which
//! cuts policy documents into bounded, overlapping windows and prefers to end
//! each window on a document-structure boundary:
//!
//! 1. section header (`\n## `)
//! 2. sub-section header (`\n### `)
//! 3. horizontal rule (`\n---`)
//! 4. paragraph break (`\n\n`)
//! 5. line break (`\n`)
//! 6. sentence end (`. `, `! `, `? `, `.\n`)
//! 7. word boundary (` `)
//!
//! Only when none of these occur in the usable part of the window is the text
//! cut at exactly `chunk_size` characters.

use tracing::debug;

use crate::config::RagConfig;
use crate::context::normalize_source;
use crate::document::{Chunk, Document, Span};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, spans and metadata but no
/// embeddings. Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document is empty or whitespace-only.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Boundary classes in priority order. Each pattern carries the byte offset
/// of the split point relative to the start of the match.
const BOUNDARIES: &[&[(&str, usize)]] = &[
    &[("\n## ", 1)],
    &[("\n### ", 1)],
    &[("\n---", 1)],
    &[("\n\n", 2)],
    &[("\n", 1)],
    &[(". ", 2), ("! ", 2), ("? ", 2), (".\n", 2)],
    &[(" ", 1)],
];

/// Longest pattern in [`BOUNDARIES`], in bytes.
const MAX_PATTERN_LEN: usize = 5;

/// Splits text into overlapping windows of at most `chunk_size` characters,
/// ending each window on the strongest structural boundary available.
///
/// Consecutive chunks of one document always share exactly `chunk_overlap`
/// characters. Chunk IDs are `{document_id}_{sequence_index}`, with `\`
/// in the document id turned into `/`; each chunk inherits the parent
/// document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::StructuralChunker;
///
/// let chunker = StructuralChunker::new(500, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct StructuralChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl StructuralChunker {
    /// Create a new `StructuralChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker using the sizes of a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute the character spans that [`chunk`](Chunker::chunk) would emit
    /// for already-cleaned `text`, including whitespace-only spans.
    pub fn split_spans(&self, text: &str) -> Vec<Span> {
        // Byte offset of every char, plus the end of the text.
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let total = offsets.len() - 1;

        let min_advance = (self.chunk_overlap + 1).max(self.chunk_size / 2);
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total {
            let end = if total - start <= self.chunk_size {
                total
            } else {
                self.find_boundary(text, &offsets, start, start + min_advance)
                    .unwrap_or(start + self.chunk_size)
            };

            spans.push(Span { start, end });
            if end == total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        spans
    }

    /// Find the split point (a char index) of the highest-priority boundary
    /// class that has an occurrence ending the chunk in `[min_end, start + chunk_size]`.
    fn find_boundary(
        &self,
        text: &str,
        offsets: &[usize],
        start: usize,
        min_end: usize,
    ) -> Option<usize> {
        let window_start = offsets[start];
        let window_end = offsets[start + self.chunk_size];
        let min_byte = offsets[min_end];
        // Let patterns straddle the window edge; the split point itself may not.
        let search_end = (window_end + MAX_PATTERN_LEN).min(text.len());
        let search_end = (search_end..=text.len()).find(|&i| text.is_char_boundary(i))?;
        let haystack = &text[window_start..search_end];

        for class in BOUNDARIES {
            let best = class
                .iter()
                .flat_map(|(pattern, split)| {
                    haystack.match_indices(pattern).map(move |(pos, _)| window_start + pos + split)
                })
                .filter(|&byte| byte >= min_byte && byte <= window_end)
                .max();

            if let Some(byte) = best {
                return offsets.binary_search(&byte).ok();
            }
        }

        None
    }
}

impl Default for StructuralChunker {
    fn default() -> Self {
        let config = RagConfig::default();
        Self { chunk_size: config.chunk_size, chunk_overlap: config.chunk_overlap }
    }
}

/// Normalise line endings so spans are stable across platforms.
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

impl Chunker for StructuralChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = clean_text(&document.text);
        if text.trim().is_empty() {
            return Vec::new();
        }

        let source = normalize_source(&document.id);
        let id_prefix = document.id.replace('\\', "/");
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();

        let mut chunks = Vec::new();
        for span in self.split_spans(&text) {
            let chunk_text = &text[offsets[span.start]..offsets[span.end]];
            if chunk_text.trim().is_empty() {
                debug!(source = %source, start = span.start, end = span.end, "dropping blank span");
                continue;
            }

            let sequence_index = chunks.len();
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), sequence_index.to_string());

            chunks.push(Chunk {
                id: format!("{id_prefix}_{sequence_index}"),
                text: chunk_text.to_string(),
                source: source.clone(),
                span,
                sequence_index,
                embedding: Vec::new(),
                metadata,
            });
        }

        chunks
    }
}

/// Chunk every document in order, concatenating the results.
pub fn chunk_documents(chunker: &dyn Chunker, documents: &[Document]) -> Vec<Chunk> {
    documents.iter().flat_map(|document| chunker.chunk(document)).collect()
}
