//! Ollama LLM Provider
//!
//! This module implements the LLMProvider trait for Ollama, a local LLM provider.
//! Ollama runs models locally on the user's machine, typically at http://localhost:11434.
//!
//! Key features:
//! - Local execution (no API keys required)
//! - Native tool calling through the `tools` request field
//! - Text fallback for models that print tool calls instead of emitting them
//! - Error mapping to LLMError

use async_trait::async_trait;
use reqwest::Client;
use sdk::types::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{LLMError, LLMProvider, Message, MessageRole, Result, ToolCall};

/// Request timeout used until [`OllamaProvider::with_timeout`] overrides it
const DEFAULT_TIMEOUT_SECS: u64 = 300;

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::warn!("Failed to build Ollama HTTP client ({}), using defaults", e);
        Client::new()
    })
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "qwen2:7b")
    model: String,

    /// Sampling temperature, server default when unset
    temperature: Option<f32>,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (e.g., "http://localhost:11434")
    /// * `model` - Model name to use (e.g., "qwen2:7b")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: None,
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Set the HTTP timeout for one chat request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Base URL the provider talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message format to Ollama's format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: msg.role.to_string(),
                content: msg.content.clone(),
                tool_calls: msg
                    .tool_calls
                    .iter()
                    .map(|call| OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_name: match msg.role {
                    MessageRole::Tool => msg.name.clone(),
                    _ => None,
                },
            })
            .collect()
    }

    /// Convert tool descriptors to Ollama's function-tool format
    fn convert_tools(&self, tools: &[ToolSpec]) -> Vec<OllamaTool> {
        tools
            .iter()
            .map(|spec| OllamaTool {
                kind: "function",
                function: OllamaFunction {
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    parameters: spec.parameters.clone(),
                },
            })
            .collect()
    }

    /// Turn Ollama's reply into an assistant message.
    ///
    /// Native tool calls win. Otherwise the content is scanned for a printed
    /// call naming one of the bound tools.
    fn reply_to_message(&self, reply: OllamaMessage, tools: &[ToolSpec]) -> Message {
        if !reply.tool_calls.is_empty() {
            let calls = reply
                .tool_calls
                .into_iter()
                .map(|tc| ToolCall::generated(tc.function.name, tc.function.arguments))
                .collect();
            return Message::assistant_with_tool_calls(reply.content, calls);
        }

        if let Some(call) = super::parse_tool_calls(&reply.content, tools) {
            tracing::debug!("Recovered tool call '{}' from text content", call.name);
            return Message::assistant_with_tool_calls(String::new(), vec![call]);
        }

        Message::assistant(reply.content)
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        // Convert messages to Ollama format
        let ollama_messages = self.convert_messages(messages);

        tracing::debug!(
            "Ollama request: model={}, messages={}, tools={}, total_chars={}",
            self.model,
            ollama_messages.len(),
            tools.len(),
            ollama_messages
                .iter()
                .map(|m| m.content.len())
                .sum::<usize>()
        );

        // Build request
        let request = OllamaRequest {
            model: self.model.clone(),
            messages: ollama_messages,
            tools: self.convert_tools(tools),
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        // Make API call
        let url = format!("{}/api/chat", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        // Check response status
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        // Parse response
        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(self.reply_to_message(ollama_response.message, tools))
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }
}

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// Ollama API response format
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}
