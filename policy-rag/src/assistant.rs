//! Question answering over the pipeline.
//!
//! [`PolicyAssistant`] routes each message by intent. Greetings get a short
//! generated reply. Out-of-scope messages get a fixed refusal. Inquiries go
//! through retrieval, prompt rendering and the generation chain. Every exchange
//! is remembered in a bounded [`ConversationHistory`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::generation::GenerationChain;
use crate::history::ConversationHistory;
use crate::intent::{Intent, IntentClassifier};
use crate::pipeline::RagPipeline;
use crate::prompts::{PromptVersion, render_greeting};

/// Reply to messages that have nothing to do with the company.
pub const OUT_OF_SCOPE_REPLY: &str = "I'm sorry, but I can't assist with that request. \
Please ask about company products, pricing, features, or policies.";

/// Reported as `model_used` when no model was consulted.
pub const OUT_OF_SCOPE_MODEL: &str = "no model used (out of scope)";

/// Everything the assistant produced for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantAnswer {
    pub answer: String,
    /// Distinct source names cited in the context, in first-appearance order.
    pub sources: Vec<String>,
    /// The formatted context handed to the model. Empty unless the message was an inquiry.
    pub context: String,
    pub intent: Intent,
    /// Strategy that produced `answer`.
    pub model_used: String,
    pub prompt_version: PromptVersion,
}

/// Conversational front end to a [`RagPipeline`].
pub struct PolicyAssistant {
    pipeline: Arc<RagPipeline>,
    classifier: Arc<dyn IntentClassifier>,
    chain: GenerationChain,
    prompt_version: PromptVersion,
    history: ConversationHistory,
}

impl PolicyAssistant {
    pub fn new(
        pipeline: Arc<RagPipeline>,
        classifier: Arc<dyn IntentClassifier>,
        chain: GenerationChain,
    ) -> Self {
        Self {
            pipeline,
            classifier,
            chain,
            prompt_version: PromptVersion::default(),
            history: ConversationHistory::default(),
        }
    }

    pub fn with_prompt_version(mut self, version: PromptVersion) -> Self {
        self.prompt_version = version;
        self
    }

    pub fn with_history(mut self, history: ConversationHistory) -> Self {
        self.history = history;
        self
    }

    pub fn prompt_version(&self) -> PromptVersion {
        self.prompt_version
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Answer one message and remember the exchange.
    ///
    /// # Errors
    ///
    /// Retrieval failures ([`RagError::IndexUnavailable`](crate::RagError::IndexUnavailable))
    /// are returned as is. Generation failures never are: the chain falls back
    /// to the raw context.
    pub async fn ask(&mut self, question: &str) -> Result<AssistantAnswer> {
        let started = Instant::now();

        let intent = match self.classifier.classify(question).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent classification failed, assuming inquiry");
                Intent::Inquiry
            }
        };

        let answer = match intent {
            Intent::Greeting => {
                let prompt = render_greeting(question, &self.history);
                let generation = self.chain.answer_with_fallback(&prompt, "").await;
                AssistantAnswer {
                    answer: generation.text,
                    sources: Vec::new(),
                    context: String::new(),
                    intent,
                    model_used: generation.strategy,
                    prompt_version: self.prompt_version,
                }
            }
            Intent::OutOfScope => AssistantAnswer {
                answer: OUT_OF_SCOPE_REPLY.to_string(),
                sources: Vec::new(),
                context: String::new(),
                intent,
                model_used: OUT_OF_SCOPE_MODEL.to_string(),
                prompt_version: self.prompt_version,
            },
            Intent::Inquiry => self.inquiry(question, &self.history).await?,
        };

        self.history.push(question, answer.answer.as_str());

        info!(
            %intent,
            model_used = %answer.model_used,
            prompt_version = %answer.prompt_version,
            sources = ?answer.sources,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );
        Ok(answer)
    }

    /// Answer `question` from the corpus as a fresh, single-turn inquiry.
    ///
    /// Skips intent routing and neither reads nor updates the conversation
    /// history, so every question goes through retrieval and generation.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](Self::ask).
    pub async fn answer_inquiry(&self, question: &str) -> Result<AssistantAnswer> {
        self.inquiry(question, &ConversationHistory::default()).await
    }

    async fn inquiry(
        &self,
        question: &str,
        history: &ConversationHistory,
    ) -> Result<AssistantAnswer> {
        let ranked = self.pipeline.query(question).await?;
        let prompt = self.prompt_version.render(question, &ranked.formatted_text, history);
        let generation = self.chain.answer_with_fallback(&prompt, &ranked.formatted_text).await;
        Ok(AssistantAnswer {
            answer: generation.text,
            sources: ranked.source_list,
            context: ranked.formatted_text,
            intent: Intent::Inquiry,
            model_used: generation.strategy,
            prompt_version: self.prompt_version,
        })
    }
}
