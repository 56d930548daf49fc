//! Context formatting and source attribution.
//!
//! [`format_context`] turns a ranked list of chunks into the single string
//! handed to the language model. Every block is labelled
//! `[Source N: file_name]` so that citations in the answer can be matched
//! back to [`RankedContext::source_list`].

use serde::{Deserialize, Serialize};

use crate::document::ScoredChunk;

/// Separator placed between labelled source blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Reduce a path-like source identifier to a bare file name.
///
/// Backslashes become forward slashes and everything up to the last `/` is
/// dropped, so `a\b\c.md` and `a/b/c.md` both yield `c.md`.
pub fn normalize_source(source: &str) -> String {
    let unified = source.replace('\\', "/");
    unified.rsplit('/').next().unwrap_or_default().to_string()
}

/// Collects normalised source names, keeping the first occurrence of each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTracker {
    sources: Vec<String>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source`; repeats are ignored. Returns the normalised name.
    pub fn record(&mut self, source: &str) -> String {
        let name = normalize_source(source);
        if !self.sources.contains(&name) {
            self.sources.push(name.clone());
        }
        name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<String> {
        self.sources
    }
}

/// The ordered chunks of one query together with their attributed context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedContext {
    /// Final ranked chunks, best first.
    pub chunks: Vec<ScoredChunk>,
    /// Labelled context string sent to the language model.
    pub formatted_text: String,
    /// Distinct source names in first-appearance order.
    pub source_list: Vec<String>,
}

impl RankedContext {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Format ranked chunks into labelled context plus a deduplicated source list.
///
/// An empty input yields an empty string and an empty source list.
pub fn format_context(chunks: &[ScoredChunk]) -> (String, Vec<String>) {
    let mut tracker = SourceTracker::new();
    let blocks: Vec<String> = chunks
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let name = tracker.record(&scored.chunk.source);
            format!("[Source {}: {name}]\n{}", i + 1, scored.chunk.text)
        })
        .collect();

    (blocks.join(BLOCK_SEPARATOR), tracker.into_sources())
}

impl From<Vec<ScoredChunk>> for RankedContext {
    fn from(chunks: Vec<ScoredChunk>) -> Self {
        let (formatted_text, source_list) = format_context(&chunks);
        Self { chunks, formatted_text, source_list }
    }
}
