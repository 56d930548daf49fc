//! Property tests for chunking, reranking, store ordering and source tracking.

use std::collections::HashMap;

use policy_rag::{
    Chunk, Chunker, Document, InMemoryVectorStore, NoOpReranker, Reranker, ScoredChunk,
    SourceTracker, Span, StructuralChunker, VectorStore, format_context, normalize_source,
    rerank_chunks,
};
use proptest::prelude::*;

/// Text drawn from policy-like pieces so every boundary class shows up.
fn arb_policy_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-zA-Z]{1,12}",
        Just(" ".to_string()),
        Just(". ".to_string()),
        Just("? ".to_string()),
        Just("\n".to_string()),
        Just("\n\n".to_string()),
        Just("\n## ".to_string()),
        Just("\n### ".to_string()),
        Just("\n---\n".to_string()),
        Just("é".to_string()),
    ];
    proptest::collection::vec(piece, 0..200).prop_map(|pieces| pieces.concat())
}

/// (chunk_size, chunk_overlap) with overlap < size.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (2usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

fn scored(id: &str, text: &str, distance: f32) -> ScoredChunk {
    ScoredChunk::new(
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            source: format!("{id}.md"),
            span: Span { start: 0, end: text.chars().count() },
            sequence_index: 0,
            embedding: Vec::new(),
            metadata: HashMap::new(),
        },
        distance,
    )
}

fn arb_results() -> impl Strategy<Value = Vec<ScoredChunk>> {
    proptest::collection::vec(("[a-z]{1,6}( [a-z]{1,6}){0,6}", 0.0f32..2.0), 0..12).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (text, distance))| scored(&format!("c{i}"), &text, distance))
                .collect()
        },
    )
}

/// *For any* text and valid sizes, spans cover the text from 0 to its end,
/// consecutive spans share exactly `chunk_overlap` characters and every span
/// is at most `chunk_size` long.
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn spans_cover_text_with_exact_overlap(
            text in arb_policy_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = StructuralChunker::new(size, overlap).unwrap();
            let spans = chunker.split_spans(&text);
            let total = text.chars().count();

            if total == 0 {
                prop_assert!(spans.is_empty());
                return Ok(());
            }

            prop_assert_eq!(spans[0].start, 0);
            prop_assert_eq!(spans.last().unwrap().end, total);
            for span in &spans {
                prop_assert!(span.len() >= 1 && span.len() <= size, "bad span {:?}", span);
            }
            for pair in spans.windows(2) {
                prop_assert_eq!(pair[1].start, pair[0].end - overlap);
                prop_assert!(pair[1].start > pair[0].start);
            }
        }

        #[test]
        fn emitted_chunks_are_non_empty_and_sequential(
            text in arb_policy_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = StructuralChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("docs/policy.md", text));

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(!chunk.text.trim().is_empty());
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert_eq!(chunk.text.chars().count(), chunk.span.len());
                prop_assert_eq!(chunk.source.as_str(), "policy.md");
            }
        }
    }
}

/// *For any* retrieved list, reranking is a deterministic permutation that
/// never changes similarity scores, and the no-op reranker is the identity.
mod prop_rerank {
    use super::*;

    fn ids(results: &[ScoredChunk]) -> Vec<String> {
        results.iter().map(|r| r.chunk.id.clone()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn rerank_is_a_deterministic_permutation(
            query in "[a-z]{1,6}( [a-z]{1,6}){0,4}",
            results in arb_results(),
        ) {
            let first = rerank_chunks(&query, results.clone());
            let second = rerank_chunks(&query, results.clone());
            prop_assert_eq!(ids(&first), ids(&second));

            let mut before = ids(&results);
            let mut after = ids(&first);
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);

            let distances: HashMap<String, f32> =
                results.iter().map(|r| (r.chunk.id.clone(), r.similarity_score)).collect();
            for r in &first {
                prop_assert_eq!(r.similarity_score, distances[&r.chunk.id]);
            }
            for pair in first.windows(2) {
                prop_assert!(pair[0].rerank_score.unwrap() >= pair[1].rerank_score.unwrap());
            }
        }

        #[test]
        fn noop_reranker_is_identity(query in "[a-z ]{0,20}", results in arb_results()) {
            prop_assert_eq!(NoOpReranker.rerank(&query, results.clone()), results);
        }
    }
}

/// *For any* source strings, normalisation is idempotent and the tracker
/// lists each distinct name once in first-appearance order.
mod prop_sources {
    use super::*;

    fn arb_source() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-c]{1,2}(\\.md)?", 1..4).prop_flat_map(|parts| {
            prop_oneof![Just(parts.join("/")), Just(parts.join("\\"))]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn normalisation_is_idempotent(source in arb_source()) {
            let once = normalize_source(&source);
            prop_assert!(!once.contains('/') && !once.contains('\\'));
            prop_assert_eq!(normalize_source(&once), once);
        }

        #[test]
        fn tracker_keeps_first_appearance_order(
            sources in proptest::collection::vec(arb_source(), 0..10)
        ) {
            let mut tracker = SourceTracker::new();
            for source in &sources {
                tracker.record(source);
            }

            let mut expected: Vec<String> = Vec::new();
            for name in sources.iter().map(|s| normalize_source(s)) {
                if !expected.contains(&name) {
                    expected.push(name);
                }
            }
            prop_assert_eq!(tracker.sources(), expected.as_slice());

            let chunks: Vec<ScoredChunk> = sources
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let mut c = scored(&format!("c{i}"), "text", 0.1);
                    c.chunk.source = s.clone();
                    c
                })
                .collect();
            let (text, listed) = format_context(&chunks);
            prop_assert_eq!(listed, expected);
            prop_assert_eq!(text.is_empty(), chunks.is_empty());
        }
    }
}

/// *For any* stored chunks, search returns at most `top_k` results in
/// ascending distance order.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 8;

    fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-1.0f32..1.0f32, DIM)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ascend_and_are_bounded_by_top_k(
            embeddings in proptest::collection::vec(arb_embedding(), 1..20),
            query in arb_embedding(),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                let chunks: Vec<Chunk> = embeddings
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        let mut c = scored(&format!("c{i}"), "text", 0.0).chunk;
                        c.embedding = e.clone();
                        c
                    })
                    .collect();
                store.upsert("test", &chunks).await.unwrap();
                store.search("test", &query, top_k).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(embeddings.len()));
            for pair in results.windows(2) {
                prop_assert!(pair[0].similarity_score <= pair[1].similarity_score);
            }
        }
    }
}
