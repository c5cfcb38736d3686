//! Conversation state for one session
//!
//! An ordered, append-only message log: system prompt, user messages,
//! assistant responses (with tool calls) and tool results. Messages are never
//! edited or removed; a session is reset by dropping the whole conversation.

use crate::llm::{Message, MessageRole};

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// All messages in insertion order
    messages: Vec<Message>,

    /// Running token estimate, for logging only
    token_count: usize,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message
    pub fn append(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);
    }

    /// Append messages in order
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.append(message);
        }
    }

    /// Get all messages in the conversation history
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the current token estimate
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Owned copy of the transcript
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Estimate the number of tokens in a message
    ///
    /// This is a rough estimate based on character count. Different tokenizers
    /// will produce different results, but this provides a reasonable approximation.
    fn estimate_tokens(message: &Message) -> usize {
        let call_chars: usize = message
            .tool_calls
            .iter()
            .map(|c| c.name.len() + c.arguments.to_string().len())
            .sum();
        let id_chars = message.tool_call_id.as_ref().map(|id| id.len()).unwrap_or(0);

        // Add overhead for role and structure (roughly 10 tokens)
        let overhead = 10;

        let total_chars = message.content.len() + call_chars + id_chars;
        total_chars.div_ceil(CHARS_PER_TOKEN) + overhead
    }
}

/// Pair each user message with the final assistant reply of its turn.
///
/// Tool-call messages and tool results are skipped. A user message whose turn
/// produced no final reply (a failed turn) pairs with an empty string.
pub fn exchanges(messages: &[Message]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for message in messages {
        match message.role {
            MessageRole::User => pairs.push((message.content.clone(), String::new())),
            MessageRole::Assistant if !message.has_tool_calls() => {
                if let Some(last) = pairs.last_mut() {
                    last.1 = message.content.clone();
                }
            }
            _ => {}
        }
    }
    pairs
}
