//! Conversation History
//!
//! In-memory transcript shared across model switches: a pinned system prompt
//! plus an ordered list of user/assistant entries. A caller-supplied token
//! counter prices each entry; when the transcript exceeds its token budget,
//! the oldest non-system entries are evicted until it fits again.
//!
//! Only completed responses belong here. An exchange that timed out or
//! failed produced nothing recordable, and callers can tell those outcomes
//! apart from completion by the error kind.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The pinned instruction prompt
    System,
    /// The human (or upstream caller)
    User,
    /// The model
    Assistant,
}

/// One chat message in provider wire shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a chat message
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One stored transcript entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry id
    pub id: String,
    /// Author
    pub role: Role,
    /// Entry text
    pub content: String,
    /// Creation time (Unix timestamp ms)
    pub timestamp_ms: i64,
}

impl HistoryEntry {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Prices a piece of text in tokens.
///
/// Each model family counts differently, so the counter is supplied by the
/// active provider profile and may be swapped when the model changes.
pub type TokenCounter = Box<dyn Fn(&str) -> usize + Send + Sync>;

/// Budgeted conversation transcript
pub struct History {
    system_prompt: String,
    entries: Vec<HistoryEntry>,
    counter: TokenCounter,
    max_tokens: usize,
}

impl History {
    /// Create a transcript with a pinned system prompt, a token budget, and
    /// the counter that prices entries against it
    #[must_use]
    pub fn new(
        system_prompt: impl Into<String>,
        max_tokens: usize,
        counter: TokenCounter,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            entries: Vec::new(),
            counter,
            max_tokens,
        }
    }

    /// Swap the token counter, re-pricing the transcript under the new
    /// model's accounting. Called when the active model changes
    /// mid-conversation.
    pub fn set_token_counter(&mut self, counter: TokenCounter) {
        self.counter = counter;
        self.trim_to_budget();
    }

    /// Record a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(HistoryEntry::new(Role::User, content.into()));
        self.trim_to_budget();
    }

    /// Record a completed assistant response
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries
            .push(HistoryEntry::new(Role::Assistant, content.into()));
        self.trim_to_budget();
    }

    /// The transcript in provider wire shape, system prompt first
    #[must_use]
    pub fn as_chat_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.entries.len() + 1);
        messages.push(ChatMessage::new(Role::System, self.system_prompt.clone()));
        messages.extend(
            self.entries
                .iter()
                .map(|e| ChatMessage::new(e.role, e.content.clone())),
        );
        messages
    }

    /// Stored entries, oldest first (system prompt excluded)
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no turns are stored yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current token price of the transcript, system prompt included
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        let counter = &self.counter;
        counter(&self.system_prompt) + self.entries.iter().map(|e| counter(&e.content)).sum::<usize>()
    }

    /// Drop all stored turns; the system prompt stays
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict oldest entries until the transcript fits the budget.
    ///
    /// The system prompt is never evicted; the newest entry survives even
    /// when it alone exceeds the budget.
    fn trim_to_budget(&mut self) {
        while self.total_tokens() > self.max_tokens && self.entries.len() > 1 {
            self.entries.remove(0);
        }
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries.len())
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn char_counter() -> TokenCounter {
        Box::new(|text: &str| text.chars().count())
    }

    #[test]
    fn test_transcript_order_and_shape() {
        let mut history = History::new("be helpful", 1000, char_counter());
        history.push_user("hello");
        history.push_assistant("hi there");

        let messages = history.as_chat_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "be helpful");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }

    #[test]
    fn test_budget_evicts_oldest_first() {
        // System prompt costs 6; each entry costs 10; budget fits two entries
        let mut history = History::new("system", 26, char_counter());
        history.push_user("aaaaaaaaaa");
        history.push_assistant("bbbbbbbbbb");
        history.push_user("cccccccccc");

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].content, "bbbbbbbbbb");
        assert_eq!(history.entries()[1].content, "cccccccccc");
    }

    #[test]
    fn test_newest_entry_survives_tiny_budget() {
        let mut history = History::new("s", 2, char_counter());
        history.push_user("far too long for the budget");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_counter_swap_reprices() {
        let mut history = History::new("s", 20, char_counter());
        history.push_user("aaaaa");
        history.push_assistant("bbbbb");
        assert_eq!(history.len(), 2);

        // A counter that prices everything tenfold forces eviction
        history.set_token_counter(Box::new(|text: &str| text.chars().count() * 10));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let mut history = History::new("s", 1000, char_counter());
        history.push_user("one");
        history.push_user("two");
        assert_ne!(history.entries()[0].id, history.entries()[1].id);
    }

    #[test]
    fn test_clear_keeps_system_prompt() {
        let mut history = History::new("keep me", 1000, char_counter());
        history.push_user("gone");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.as_chat_messages()[0].content, "keep me");
    }
}
