//! Wiring of pipeline, generators and classifier from command-line options.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use policy_rag::{
    ChatCompletionsGenerator, DirectoryVectorStore, EmbeddingProvider, GenerationChain,
    HashingEmbeddingProvider, IntentClassifier, KeywordIntentClassifier, LlmIntentClassifier,
    OpenAIEmbeddingProvider, PolicyAssistant, RagConfig, RagPipeline,
};
use tracing::{info, warn};

use crate::Options;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedder {
    /// Offline feature-hashing embeddings
    Hashing,
    /// OpenAI embeddings (needs OPENAI_API_KEY)
    Openai,
}

/// `POLICY_RAG_*` environment settings with command-line overrides applied.
pub fn config(options: &Options) -> Result<RagConfig> {
    let mut config = RagConfig::from_env().context("invalid POLICY_RAG_* configuration")?;
    if let Some(top_k) = options.top_k {
        config.top_k = top_k;
    }
    if options.no_rerank {
        config.use_reranking = false;
    }
    config.validate()?;
    Ok(config)
}

fn embedding_provider(embedder: Embedder) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match embedder {
        Embedder::Hashing => Arc::new(HashingEmbeddingProvider::default()),
        Embedder::Openai => Arc::new(OpenAIEmbeddingProvider::from_env()?),
    })
}

/// Build a pipeline over `store`.
pub fn pipeline(options: &Options, store: Arc<DirectoryVectorStore>) -> Result<RagPipeline> {
    let pipeline = RagPipeline::builder()
        .config(config(options)?)
        .embedding_provider(embedding_provider(options.embedder)?)
        .vector_store(store)
        .build()?;
    Ok(pipeline)
}

/// Primary then fallback chat model, when a Groq key is available.
fn generation_chain(options: &Options) -> GenerationChain {
    if options.offline {
        return GenerationChain::new();
    }

    let Ok(api_key) = std::env::var("GROQ_API_KEY") else {
        warn!("GROQ_API_KEY is not set; answers will fall back to the raw retrieved context");
        return GenerationChain::new();
    };

    let mut chain = GenerationChain::new();
    for model in [&options.model, &options.fallback_model] {
        match ChatCompletionsGenerator::new(api_key.clone(), model.as_str()) {
            Ok(generator) => chain = chain.with(Arc::new(generator)),
            Err(e) => warn!(model = %model, error = %e, "skipping chat model"),
        }
    }
    chain
}

/// Open the existing index and assemble the assistant around it.
pub async fn assistant(options: &Options) -> Result<PolicyAssistant> {
    let config = config(options)?;
    let store = DirectoryVectorStore::open_existing(&options.index_dir, &config.collection)
        .await
        .context("the index has not been built; run `policy-rag build` first")?;
    let pipeline = pipeline(options, Arc::new(store))?;

    let chain = generation_chain(options);
    let classifier: Arc<dyn IntentClassifier> = if chain.is_empty() {
        Arc::new(KeywordIntentClassifier)
    } else {
        Arc::new(LlmIntentClassifier::new(chain.clone()))
    };

    info!(
        strategies = ?chain.strategies(),
        prompt_version = %options.prompt,
        use_reranking = pipeline.config().use_reranking,
        "assistant ready"
    );
    Ok(PolicyAssistant::new(Arc::new(pipeline), classifier, chain)
        .with_prompt_version(options.prompt))
}
