//! Model Service Abstraction Layer
//!
//! This module provides the contract the turn loop uses to talk to a chat model.
//! An [`LLMProvider`] turns an ordered message history plus a set of tool
//! descriptors into exactly one assistant message. [`BoundModel`] fixes the
//! tool descriptors once ("binding") so the loop only hands over messages.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod ollama;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Default timeout for a single model call
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Timeout => EngineError::LLMTimeout,
            other => EngineError::ModelService(other.to_string()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call request from the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Structured arguments for the tool
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool call with a freshly generated id
    pub fn generated(name: impl Into<String>, arguments: Value) -> Self {
        Self::new(format!("call_{}", uuid::Uuid::new_v4()), name, arguments)
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Tool calls requested by an assistant message, in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Originating call id on tool result messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name on tool result messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    /// Create an assistant message requesting tool calls
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(MessageRole::Assistant, content)
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    /// Create a tool result message answering `call`
    pub fn tool_result(content: impl Into<String>, call: &ToolCall) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::plain(MessageRole::Tool, content)
        }
    }

    /// True if this is an assistant message with at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.role == MessageRole::Assistant && !self.tool_calls.is_empty()
    }
}

/// Model service trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama")
    fn name(&self) -> &str;

    /// Returns the model the provider talks to
    fn model(&self) -> &str;

    /// Generate the next assistant message
    ///
    /// # Arguments
    /// * `messages` - Conversation history including system prompt, user messages, and tool results
    /// * `tools` - Tool descriptors the model may request
    ///
    /// # Returns
    /// * `Ok(Message)` - One assistant message, possibly carrying tool calls
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// A provider with a fixed set of tools bound to it.
#[derive(Clone)]
pub struct BoundModel {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<[ToolSpec]>,
    timeout: Duration,
}

impl fmt::Debug for BoundModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundModel")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("tools", &self.tool_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BoundModel {
    /// Bind `tools` to `provider`
    pub fn bind(provider: Arc<dyn LLMProvider>, tools: Vec<ToolSpec>) -> Self {
        Self {
            provider,
            tools: tools.into(),
            timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tool descriptors bound to the model
    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Names of the bound tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// The underlying provider
    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    /// Call the model with the full history and return its message.
    ///
    /// Whatever role the provider reports, the returned message is an
    /// assistant message.
    pub async fn invoke(&self, messages: &[Message]) -> std::result::Result<Message, EngineError> {
        let result =
            tokio::time::timeout(self.timeout, self.provider.generate(messages, &self.tools)).await;

        match result {
            Ok(Ok(mut message)) => {
                message.role = MessageRole::Assistant;
                Ok(message)
            }
            Ok(Err(e)) => {
                tracing::warn!("Provider {} failed: {}", self.provider.name(), e);
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(
                    "Provider {} timed out after {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                );
                Err(EngineError::LLMTimeout)
            }
        }
    }
}

/// Helper function to parse a tool call from string content.
///
/// Used for models that answer tool requests in plain text instead of the
/// native tool-call field. Handles multiple output formats:
/// 1. Raw JSON: `{"function": "...", "arguments": {...}}` or `{"name": "...", "arguments": {...}}`
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. `<tool_call>name({...})</tool_call>` or `<tool_call>{...}</tool_call>` markers
/// 4. JSON embedded in prose: scans for `{"function":` / `{"name":` anywhere
///
/// Only names listed in `known` are accepted, so ordinary JSON in an answer is
/// not mistaken for a tool request.
pub fn parse_tool_calls(content: &str, known: &[ToolSpec]) -> Option<ToolCall> {
    let call = find_tool_call(content.trim())?;
    if known.iter().any(|spec| spec.name == call.name) {
        Some(call)
    } else {
        None
    }
}

fn find_tool_call(trimmed: &str) -> Option<ToolCall> {
    // Pattern 1: Raw JSON
    if let Some(tc) = try_parse_function_json(trimmed) {
        return Some(tc);
    }

    // Pattern 2: Extract from markdown code fences (even with trailing text)
    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(tc) = try_parse_function_json(inner.trim()) {
            return Some(tc);
        }
    }

    // Pattern 3: <tool_call>...</tool_call> markers
    // A closing marker only counts after the opening one
    if let Some(start) = trimmed.find("<tool_call>") {
        let after_open = &trimmed[start + "<tool_call>".len()..];
        if let Some(end) = after_open.find("</tool_call>") {
            let tool_content = after_open[..end].trim();
            if let Some(tc) = try_parse_function_json(tool_content) {
                return Some(tc);
            }
            if let Some(paren_pos) = tool_content.find('(') {
                let tool_name = &tool_content[..paren_pos];
                let args_end = tool_content.rfind(')').unwrap_or(tool_content.len());
                let raw_args = tool_content.get(paren_pos + 1..args_end).unwrap_or("");
                let arguments = serde_json::from_str(raw_args).unwrap_or(Value::Null);

                return Some(ToolCall::generated(tool_name.trim(), arguments));
            }
        }
    }

    // Pattern 4: Scan for a call object anywhere in the content
    for marker in ["{\"function\"", "{\"name\""] {
        if let Some(pos) = trimmed.find(marker) {
            if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
                if let Some(tc) = try_parse_function_json(json_str) {
                    return Some(tc);
                }
            }
        }
    }

    None
}

/// Try to parse a string as a `{"function"|"name": "...", "arguments": {...}}` tool call.
fn try_parse_function_json(s: &str) -> Option<ToolCall> {
    let json: Value = serde_json::from_str(s).ok()?;
    let function = json
        .get("function")
        .or_else(|| json.get("name"))?
        .as_str()?;
    let arguments = json
        .get("arguments")
        .or_else(|| json.get("parameters"))?
        .clone();
    Some(ToolCall::generated(function, arguments))
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
