//! Shared fakes for the engine integration tests

#![allow(dead_code)]

use alfred_engine::agent::{AgentCore, SessionStore, TurnLimits, TurnRouter};
use alfred_engine::llm::{BoundModel, LLMError, LLMProvider, Message, ToolCall};
use alfred_engine::tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SYSTEM_PROMPT: &str = "You are Alfred, a helpful butler.";

/// What the scripted model does once its script runs out
#[derive(Debug, Clone)]
pub enum Fallback {
    /// Fail with a provider error
    Fail,
    /// Answer "echo: <last user message>"
    Echo,
    /// Request the named tool forever
    CallTool(String),
}

/// Model that replays a fixed list of replies
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Message, LLMError>>>,
    fallback: Fallback,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Message, LLMError>>) -> Self {
        Self::with_fallback(script, Fallback::Fail)
    }

    pub fn with_fallback(script: Vec<Result<Message, LLMError>>, fallback: Fallback) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::with_fallback(vec![], Fallback::Echo)
    }

    /// `(history length, bound tool count)` of each call
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, LLMError> {
        self.calls.lock().unwrap().push((messages.len(), tools.len()));
        // Yield so concurrent turns get a chance to interleave if they could
        tokio::task::yield_now().await;

        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return reply;
        }

        match &self.fallback {
            Fallback::Fail => Err(LLMError::ProviderUnavailable("script exhausted".into())),
            Fallback::Echo => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == alfred_engine::llm::MessageRole::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(Message::assistant(format!("echo: {}", last_user)))
            }
            Fallback::CallTool(name) => Ok(Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::generated(name.clone(), serde_json::json!({}))],
            )),
        }
    }
}

/// Tool returning a fixed answer after an optional delay, logging each call
pub struct FakeTool {
    name: String,
    reply: Result<String, String>,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeTool {
    pub fn new(name: &str, reply: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            log: Arc::clone(log),
        }
    }

    pub fn failing(name: &str, error: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            reply: Err(error.to_string()),
            ..Self::new(name, "", log)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Tool for FakeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(self.name.as_str(), "Test tool", &[])
    }

    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        tokio::time::sleep(self.delay).await;
        let args = Value::Object(input.params.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("{}({})", self.name, args));
        match &self.reply {
            Ok(text) => Ok(ToolOutput::text(text.as_str())),
            Err(e) => Err(ToolError::Upstream(e.clone())),
        }
    }
}

pub fn tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall::new(id, name, args)
}

pub fn calls_tools(calls: Vec<ToolCall>) -> Result<Message, LLMError> {
    Ok(Message::assistant_with_tool_calls("", calls))
}

pub fn answers(text: &str) -> Result<Message, LLMError> {
    Ok(Message::assistant(text))
}

pub fn agent_with(
    provider: Arc<ScriptedProvider>,
    tools: Vec<Arc<dyn Tool>>,
    limits: TurnLimits,
) -> AgentCore {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).unwrap();
    }
    let registry = Arc::new(registry);
    let model = BoundModel::bind(provider, registry.specs());
    let router = TurnRouter::new(model, registry, SYSTEM_PROMPT).with_limits(limits);
    AgentCore::new(router, Arc::new(SessionStore::new()))
}

pub fn agent(provider: Arc<ScriptedProvider>, tools: Vec<Arc<dyn Tool>>) -> AgentCore {
    agent_with(provider, tools, TurnLimits::default())
}
