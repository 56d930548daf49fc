//! Intent routing for incoming messages.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::generation::GenerationChain;
use crate::prompts::render_intent;

/// What the user is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Greeting,
    Inquiry,
    OutOfScope,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "GREETING",
            Self::Inquiry => "INQUIRY",
            Self::OutOfScope => "OUT_OF_SCOPE",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a classifier reply onto an [`Intent`].
///
/// Matching is case-insensitive and by containment, with `OUT_OF_SCOPE`
/// checked before `INQUIRY`. Anything else is a greeting.
pub fn parse_intent(reply: &str) -> Intent {
    let reply = reply.to_uppercase();
    if reply.contains("OUT_OF_SCOPE") {
        Intent::OutOfScope
    } else if reply.contains("INQUIRY") {
        Intent::Inquiry
    } else {
        Intent::Greeting
    }
}

/// Decides the [`Intent`] of a message.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> Result<Intent>;
}

/// Classifier that asks a language model using the intent prompt.
///
/// Fails when every model in the chain fails; the caller picks the fallback.
pub struct LlmIntentClassifier {
    chain: GenerationChain,
}

impl LlmIntentClassifier {
    pub fn new(chain: GenerationChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, message: &str) -> Result<Intent> {
        let generation = self.chain.generate(&render_intent(message)).await?;
        let intent = parse_intent(&generation.text);
        debug!(%intent, strategy = %generation.strategy, "classified message");
        Ok(intent)
    }
}

const GREETING_WORDS: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank", "bye", "goodbye", "morning", "afternoon", "evening",
    "cheers",
];

const POLICY_WORDS: &[&str] = &[
    "refund", "refunds", "return", "returns", "cancel", "cancellation", "shipping", "delivery",
    "order", "orders", "price", "pricing", "plan", "plans", "subscription", "policy", "policies",
    "warranty", "account", "payment", "invoice", "feature", "features", "product", "products",
    "exchange", "privacy", "data", "fee", "fees", "trial",
];

/// Offline classifier based on word lists.
///
/// Short messages made only of greeting words are greetings; messages that
/// mention a policy topic are inquiries; everything else is out of scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn classify_text(&self, message: &str) -> Intent {
        let words: Vec<String> = message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mentions = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));

        if mentions(POLICY_WORDS) {
            Intent::Inquiry
        } else if words.is_empty() || (words.len() <= 6 && mentions(GREETING_WORDS)) {
            Intent::Greeting
        } else {
            Intent::OutOfScope
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, message: &str) -> Result<Intent> {
        Ok(self.classify_text(message))
    }
}
