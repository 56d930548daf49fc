//! Bounded conversation memory.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of turns kept when no capacity is given.
pub const DEFAULT_MAX_TURNS: usize = 5;

/// One user message and the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// The last `capacity` turns of a conversation, oldest first.
///
/// Pushing a turn into a full history evicts the oldest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationHistory {
    /// Create a history holding at most `capacity` turns. A capacity of zero
    /// keeps nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { turns: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn { user: user.into(), assistant: assistant.into() });
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Render as alternating `User:` / `Assistant:` lines.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("User: {}\nAssistant: {}", turn.user, turn.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_turn_when_full() {
        let mut history = ConversationHistory::with_capacity(2);
        history.push("q1", "a1");
        history.push("q2", "a2");
        history.push("q3", "a3");

        let users: Vec<_> = history.turns().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["q2", "q3"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = ConversationHistory::with_capacity(0);
        history.push("q", "a");
        assert!(history.is_empty());
    }

    #[test]
    fn renders_in_order() {
        let mut history = ConversationHistory::default();
        history.push("hi", "hello");
        history.push("refunds?", "7-10 days");
        assert_eq!(
            history.render(),
            "User: hi\nAssistant: hello\nUser: refunds?\nAssistant: 7-10 days"
        );
        history.clear();
        assert_eq!(history.render(), "");
    }
}
