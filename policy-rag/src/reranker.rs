//! Reranking of retrieved chunks.
//!
//! Pure vector retrieval can miss exact policy keywords ("refund", "notice
//! period"). [`KeywordOverlapReranker`] re-orders the retriever's output by
//! `overlap - similarity_score`, where `overlap` is the number of distinct
//! query words found in the chunk and `similarity_score` is the index distance.
//! The two terms are not normalised against each other.

use std::collections::HashSet;

use crate::document::ScoredChunk;

/// A reranker that reorders retrieved chunks for a query.
pub trait Reranker: Send + Sync {
    /// Rerank `results` for `query`. Similarity scores are never modified.
    fn rerank(&self, query: &str, results: Vec<ScoredChunk>) -> Vec<ScoredChunk>;
}

/// A no-op reranker that returns results unchanged.
///
/// Used when reranking is disabled in the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

impl Reranker for NoOpReranker {
    fn rerank(&self, _query: &str, results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        results
    }
}

/// Hybrid lexical-overlap + distance reranker. See [`rerank_chunks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlapReranker;

impl Reranker for KeywordOverlapReranker {
    fn rerank(&self, query: &str, results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        rerank_chunks(query, results)
    }
}

/// Lowercased, whitespace-delimited set of words.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Reorder `results` by `overlap - similarity_score`, descending.
///
/// Ties keep the retriever's original order. The computed score is stored in
/// [`ScoredChunk::rerank_score`]. With an empty query every overlap is zero,
/// so the order degrades to ascending distance.
pub fn rerank_chunks(query: &str, results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    let query_words = word_set(query);

    let mut scored: Vec<(usize, ScoredChunk)> = results
        .into_iter()
        .enumerate()
        .map(|(rank, mut result)| {
            let chunk_words = word_set(&result.chunk.text);
            let overlap = query_words.intersection(&chunk_words).count();
            result.rerank_score = Some(overlap as f32 - result.similarity_score);
            (rank, result)
        })
        .collect();

    scored.sort_by(|(rank_a, a), (rank_b, b)| {
        let score_a = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
        let score_b = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
        score_b.total_cmp(&score_a).then(rank_a.cmp(rank_b))
    });

    scored.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::{Chunk, Span};

    fn result(id: &str, text: &str, distance: f32) -> ScoredChunk {
        ScoredChunk::new(
            Chunk {
                id: id.to_string(),
                text: text.to_string(),
                source: "policy.md".to_string(),
                span: Span { start: 0, end: text.len() },
                sequence_index: 0,
                embedding: Vec::new(),
                metadata: HashMap::new(),
            },
            distance,
        )
    }

    fn ids(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn overlap_and_distance_decide_order() {
        let retrieved = vec![
            result("a", "refund processing", 0.2),
            result("b", "shipping", 0.5),
            result("c", "refund", 0.3),
        ];
        let reranked = rerank_chunks("refund processing time", retrieved);

        // a: 2 - 0.2 = 1.8, c: 1 - 0.3 = 0.7, b: 0 - 0.5 = -0.5
        assert_eq!(ids(&reranked), vec!["a", "c", "b"]);
        let top = reranked[0].rerank_score.unwrap();
        assert!((top - 1.8).abs() < 1e-6);
        assert_eq!(reranked[0].similarity_score, 0.2);
    }

    #[test]
    fn lexical_match_can_beat_a_closer_chunk() {
        let retrieved = vec![
            result("near", "general company overview", 0.1),
            result("far", "the notice period is thirty days", 0.6),
        ];
        let reranked = rerank_chunks("notice period", retrieved);
        assert_eq!(ids(&reranked), vec!["far", "near"]);
    }

    #[test]
    fn empty_query_falls_back_to_ascending_distance() {
        let retrieved = vec![
            result("x", "alpha", 0.4),
            result("y", "beta", 0.1),
            result("z", "gamma", 0.3),
        ];
        let reranked = rerank_chunks("", retrieved);
        assert_eq!(ids(&reranked), vec!["y", "z", "x"]);
    }

    #[test]
    fn ties_keep_retriever_order() {
        let retrieved = vec![
            result("first", "refund", 0.25),
            result("second", "REFUND", 0.25),
            result("third", "Refund", 0.25),
        ];
        let reranked = rerank_chunks("refund", retrieved);
        assert_eq!(ids(&reranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_words_count_once() {
        let retrieved = vec![
            result("repeat", "refund refund refund", 0.0),
            result("pair", "refund window", 0.0),
        ];
        let reranked = rerank_chunks("refund refund window", retrieved);
        assert_eq!(reranked[0].chunk.id, "pair");
        assert_eq!(reranked[0].rerank_score, Some(2.0));
        assert_eq!(reranked[1].rerank_score, Some(1.0));
    }

    #[test]
    fn noop_reranker_is_identity() {
        let retrieved = vec![result("b", "shipping", 0.5), result("a", "refund", 0.2)];
        let passed = NoOpReranker.rerank("refund", retrieved.clone());
        assert_eq!(passed, retrieved);
    }
}
