//! Retrieval-augmented question answering over company policy documents.
//!
//! This crate provides:
//! - A structure-aware [`StructuralChunker`] with exact overlap between chunks
//! - Embedding providers ([`HashingEmbeddingProvider`] offline, OpenAI over HTTP)
//! - Vector stores ([`InMemoryVectorStore`] and the file-backed [`DirectoryVectorStore`])
//! - A [`Retriever`], a keyword-overlap [`Reranker`] and a source-labelled context formatter
//! - The [`RagPipeline`] tying build-time and query-time together
//! - A [`PolicyAssistant`] that routes messages by intent and answers through a
//!   [`GenerationChain`] of language models with a raw-context fallback
//! - An [`evaluation`](run_evaluation) harness with heuristic scoring
//!
//! # Features
//!
//! - `http` (default): [`OpenAIEmbeddingProvider`] and [`ChatCompletionsGenerator`] via `reqwest`.

mod assistant;
mod chunking;
mod config;
mod context;
mod directory;
mod document;
mod embedding;
mod error;
mod evaluation;
mod generation;
mod hashing;
mod history;
mod inmemory;
mod intent;
mod loader;
mod pipeline;
mod prompts;
mod reranker;
mod retriever;
mod vectorstore;

#[cfg(feature = "http")]
mod chat;
#[cfg(feature = "http")]
mod openai;

pub use assistant::{AssistantAnswer, OUT_OF_SCOPE_MODEL, OUT_OF_SCOPE_REPLY, PolicyAssistant};
pub use chunking::{Chunker, StructuralChunker, chunk_documents, clean_text};
pub use config::{DEFAULT_COLLECTION, RagConfig, RagConfigBuilder};
pub use context::{
    BLOCK_SEPARATOR, RankedContext, SourceTracker, format_context, normalize_source,
};
pub use directory::DirectoryVectorStore;
pub use document::{Chunk, Document, ScoredChunk, Span};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use evaluation::{
    ComparisonRow, EvalCategory, EvalQuestion, EvalReport, EvalSummary, HallucinationCheck,
    QuestionScore, ReportComparison, Verdict, check_hallucination, check_keywords,
    compare_reports, default_questions, run_evaluation, score_answer, source_hit, verdict,
};
pub use generation::{
    Generation, GenerationChain, Generator, RAW_CONTEXT_STRATEGY, StaticGenerator,
    raw_context_answer,
};
pub use hashing::{DEFAULT_DIMENSIONS, HashingEmbeddingProvider};
pub use history::{ConversationHistory, DEFAULT_MAX_TURNS, Turn};
pub use inmemory::InMemoryVectorStore;
pub use intent::{
    Intent, IntentClassifier, KeywordIntentClassifier, LlmIntentClassifier, parse_intent,
};
pub use loader::load_documents;
pub use pipeline::{IndexSummary, RagPipeline, RagPipelineBuilder};
pub use prompts::{INTENT_PROMPT, NOT_AVAILABLE, PromptVersion, render_greeting, render_intent};
pub use reranker::{KeywordOverlapReranker, NoOpReranker, Reranker, rerank_chunks, word_set};
pub use retriever::Retriever;
pub use vectorstore::{VectorStore, cosine_distance};

#[cfg(feature = "http")]
pub use chat::{
    ChatCompletionsGenerator, DEFAULT_FALLBACK_MODEL, DEFAULT_PRIMARY_MODEL, GROQ_API_BASE,
};
#[cfg(feature = "http")]
pub use openai::{OPENAI_API_BASE, OpenAIEmbeddingProvider};
