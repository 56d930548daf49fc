//! Prompt templates handed to the generation boundary.
//!
//! Two answer templates exist. [`PromptVersion::V1`] is a minimal instruction.
//! [`PromptVersion::V2`] adds explicit rules, mandatory `[Source: filename]`
//! citations, a fixed Answer/Sources/Confidence layout and the refusal
//! sentence [`NOT_AVAILABLE`]. Source names in the context produced by
//! [`format_context`](crate::format_context) are the same bare file names the
//! model is asked to cite.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;
use crate::history::ConversationHistory;

/// Refusal sentence the v2 template asks for when context is insufficient.
pub const NOT_AVAILABLE: &str =
    "This information is not available in the provided policy documents.";

const PROMPT_V1: &str = "\
You are a helpful assistant for company policies.

Use the following context to answer the question. If the answer is not
in the context, say \"I don't have enough information to answer this.\"
{history}
Context:
{context}

Question: {question}

Answer:";

const PROMPT_V2: &str = "\
You are a precise policy assistant. Your job is to answer questions ONLY
using the provided context from company policy documents.

RULES:
1. ONLY use information explicitly stated in the context below.
2. Do NOT add any information, assumptions, or details beyond the context.
3. If the context does not contain the answer, respond with:
   \"{not_available}\"
4. If only part of the question can be answered, answer what you can and
   clearly state which part cannot be answered from the available context.
5. Cite the source document for each piece of information using [Source: filename].
6. Use bullet points for multi-part answers.
{history}
CONTEXT:
{context}

QUESTION: {question}

Respond in this format:
**Answer:**
<your answer here, with [Source: filename] citations>

**Sources:** <list the source document(s) used>

**Confidence:** <High / Medium / Low - based on how well the context covers the question>";

const PROMPT_GREETING: &str = "\
You are a friendly assistant for company policy questions. The user has sent
a greeting or a farewell. Reply briefly and warmly in one or two sentences,
and invite them to ask about refunds, cancellations, shipping or other
company policies. Do not answer policy questions in this reply.
{history}
User message: {question}";

/// Intent classifier instruction. The reply is parsed by
/// [`parse_intent`](crate::intent::parse_intent).
pub const INTENT_PROMPT: &str = "\
You are an intent classifier for questions sent to a company policy assistant.
Classify the user's message into one of the following categories:
- GREETING: Casual hello, hi, thanks or bye messages.
- INQUIRY: Questions about products, pricing, features, or policies.
- OUT_OF_SCOPE: Messages that are irrelevant to the company or cannot be answered.

Respond with ONLY one word: GREETING, INQUIRY, or OUT_OF_SCOPE. No other text.

Message: {question}";

/// The answer template to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVersion {
    V1,
    #[default]
    V2,
}

impl PromptVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::V1 => PROMPT_V1,
            Self::V2 => PROMPT_V2,
        }
    }

    /// Render the answer prompt for `question` over `context`.
    ///
    /// Prior turns from `history` are included when there are any.
    pub fn render(&self, question: &str, context: &str, history: &ConversationHistory) -> String {
        fill(
            self.template(),
            &[
                ("question", question),
                ("context", context),
                ("history", &history_block(history)),
                ("not_available", NOT_AVAILABLE),
            ],
        )
    }
}

impl fmt::Display for PromptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptVersion {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(RagError::ConfigError(format!(
                "unknown prompt version '{other}', use v1 or v2"
            ))),
        }
    }
}

/// Render the greeting reply prompt.
pub fn render_greeting(message: &str, history: &ConversationHistory) -> String {
    fill(PROMPT_GREETING, &[("question", message), ("history", &history_block(history))])
}

/// Render the intent classification prompt.
pub fn render_intent(message: &str) -> String {
    fill(INTENT_PROMPT, &[("question", message)])
}

fn history_block(history: &ConversationHistory) -> String {
    if history.is_empty() {
        String::new()
    } else {
        format!("\nConversation so far:\n{}\n", history.render())
    }
}

/// Substitute `{name}` placeholders in one pass, so values that themselves
/// contain braces are inserted verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            values.iter().find(|(key, _)| *key == name).map(|(_, value)| (close, *value))
        });

        match replacement {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!("v1".parse::<PromptVersion>().unwrap(), PromptVersion::V1);
        assert_eq!(" V2 ".parse::<PromptVersion>().unwrap(), PromptVersion::V2);
        assert!(matches!("v3".parse::<PromptVersion>(), Err(RagError::ConfigError(_))));
        assert_eq!(PromptVersion::default(), PromptVersion::V2);
    }

    #[test]
    fn v2_carries_citation_and_refusal_rules() {
        let prompt = PromptVersion::V2.render(
            "How long do refunds take?",
            "[Source 1: refund_policy.md]\nRefunds take 7-10 days.",
            &ConversationHistory::default(),
        );
        assert!(prompt.contains("[Source: filename]"));
        assert!(prompt.contains(NOT_AVAILABLE));
        assert!(prompt.contains("QUESTION: How long do refunds take?"));
        assert!(prompt.contains("[Source 1: refund_policy.md]"));
        assert!(prompt.contains("**Confidence:**"));
        assert!(!prompt.contains("Conversation so far"));
        assert!(!prompt.contains("{history}"));
    }

    #[test]
    fn history_is_rendered_when_present() {
        let mut history = ConversationHistory::with_capacity(2);
        history.push("Can I cancel?", "Yes, within 14 days.");
        let prompt = PromptVersion::V1.render("And after that?", "ctx", &history);
        assert!(prompt.contains("Conversation so far:"));
        assert!(prompt.contains("User: Can I cancel?"));
        assert!(prompt.contains("Assistant: Yes, within 14 days."));
    }

    #[test]
    fn values_with_braces_are_not_expanded() {
        let out =
            fill("Q: {question} C: {context}", &[("question", "{context}"), ("context", "x")]);
        assert_eq!(out, "Q: {context} C: x");
        assert_eq!(fill("keep {unknown} and {", &[]), "keep {unknown} and {");
    }

    #[test]
    fn intent_prompt_embeds_message() {
        assert!(render_intent("hello there").ends_with("Message: hello there"));
    }
}
