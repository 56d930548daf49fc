//! Generation boundary: language-model strategies tried in order.
//!
//! A [`GenerationChain`] holds an ordered list of [`Generator`]s (for example
//! a fast primary model, then a larger fallback). Each is tried in turn until
//! one succeeds; the returned [`Generation`] names the strategy that answered.
//! [`GenerationChain::answer_with_fallback`] adds a final strategy that hands
//! the raw retrieved context back to the user.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RagError, Result};

/// Strategy name reported when every generator failed.
pub const RAW_CONTEXT_STRATEGY: &str = "none (raw context)";

/// A text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Identifier reported as the strategy that answered, usually the model name.
    fn name(&self) -> &str;

    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A completed generation and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub strategy: String,
}

/// Ordered chain of generation strategies.
#[derive(Clone, Default)]
pub struct GenerationChain {
    generators: Vec<Arc<dyn Generator>>,
}

impl GenerationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a generator; earlier generators are tried first.
    pub fn with(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Names of the configured strategies, in order.
    pub fn strategies(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }

    /// Try every generator in order and return the first success.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] listing each failure if no
    /// generator succeeded (or none is configured).
    pub async fn generate(&self, prompt: &str) -> Result<Generation> {
        let mut failures = Vec::new();

        for generator in &self.generators {
            match generator.generate(prompt).await {
                Ok(text) => {
                    info!(strategy = generator.name(), "generation succeeded");
                    return Ok(Generation { text, strategy: generator.name().to_string() });
                }
                Err(e) => {
                    warn!(
                        strategy = generator.name(),
                        error = %e,
                        "generation failed, trying next"
                    );
                    failures.push(format!("{}: {e}", generator.name()));
                }
            }
        }

        let message = if failures.is_empty() {
            "no generators configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(RagError::GenerationError { generator: "chain".to_string(), message })
    }

    /// Like [`generate`](Self::generate), but when every generator fails,
    /// answer with the raw `context` under [`RAW_CONTEXT_STRATEGY`].
    pub async fn answer_with_fallback(&self, prompt: &str, context: &str) -> Generation {
        match self.generate(prompt).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "all generators failed, returning raw context");
                Generation {
                    text: raw_context_answer(context),
                    strategy: RAW_CONTEXT_STRATEGY.to_string(),
                }
            }
        }
    }
}

/// Last-resort answer that surfaces the retrieved context verbatim.
pub fn raw_context_answer(context: &str) -> String {
    format!(
        "LLM is currently unavailable. Here is the raw context retrieved:\n\n{context}\n\n\
         Please review the above context to find your answer."
    )
}

/// A generator that always returns the same reply.
///
/// Useful for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    name: String,
    reply: String,
}

impl StaticGenerator {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self { name: name.into(), reply: reply.into() }
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}
