//! Turn Router
//!
//! Drives one turn over a conversation as a small state machine:
//!
//! ```text
//!            tool calls            results appended
//! Assistant ───────────▶ Tools ─────────────────────▶ Assistant
//!     │
//!     │ no tool calls
//!     ▼
//!   Done
//! ```
//!
//! Model and tool failures are not handled here. They end the turn with an
//! error and whatever was appended so far stays in the conversation.
//!
//! # Limits
//!
//! - Max tool rounds per turn (default 20)
//! - Max tool result / final answer size (default 5MB)
//! - The per-call model timeout lives in [`BoundModel`]

use sdk::errors::EngineError;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::llm::{BoundModel, Message};
use crate::tools::ToolRegistry;

use super::Conversation;

/// Maximum number of tool rounds per turn
pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// Maximum result size in bytes (5MB)
pub const DEFAULT_MAX_RESULT_BYTES: usize = 5 * 1024 * 1024;

/// Position of the router within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Call the model with the full history
    Assistant,
    /// Execute the tool calls of the latest assistant message
    Tools,
    /// Turn finished; the latest message is the answer
    Done,
}

/// Decision taken after an assistant step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    Done,
}

impl From<Route> for TurnState {
    fn from(route: Route) -> Self {
        match route {
            Route::Tools => TurnState::Tools,
            Route::Done => TurnState::Done,
        }
    }
}

/// Decide where to go next by looking at the latest message only.
///
/// `Tools` iff it is an assistant message carrying at least one tool call.
pub fn route(conversation: &Conversation) -> Route {
    match conversation.last() {
        Some(message) if message.has_tool_calls() => Route::Tools,
        _ => Route::Done,
    }
}

/// Guards applied to every turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    pub max_rounds: usize,
    pub max_result_bytes: usize,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
        }
    }
}

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Content of the final assistant message
    pub answer: String,

    /// Number of tool rounds executed
    pub rounds: usize,
}

/// The assistant/tools loop
pub struct TurnRouter {
    model: BoundModel,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    limits: TurnLimits,
}

impl TurnRouter {
    pub fn new(model: BoundModel, tools: Arc<ToolRegistry>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            tools,
            system_prompt: system_prompt.into(),
            limits: TurnLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TurnLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn model(&self) -> &BoundModel {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn limits(&self) -> TurnLimits {
        self.limits
    }

    /// Append the user message, preceded by the system prompt when this is
    /// the conversation's first exchange.
    pub fn enter_turn(&self, conversation: &mut Conversation, user_message: Message) {
        if conversation.is_empty() {
            conversation.append(Message::system(self.system_prompt.as_str()));
        }
        conversation.append(user_message);
    }

    /// Call the model with the full history and append its message.
    pub async fn run_assistant_step(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(), EngineError> {
        let reply = self.model.invoke(conversation.messages()).await?;

        if !reply.has_tool_calls() {
            self.check_size("Final answer", reply.content.len())?;
        }

        debug!(
            "Assistant step: {} tool calls, {} chars",
            reply.tool_calls.len(),
            reply.content.len()
        );
        conversation.append(reply);
        Ok(())
    }

    /// Run every tool call of the latest assistant message in request order,
    /// appending one tool-result message per call.
    ///
    /// Returns the number of calls executed.
    pub async fn run_tools_step(&self, conversation: &mut Conversation) -> Result<usize, EngineError> {
        let calls = match conversation.last() {
            Some(message) if message.has_tool_calls() => message.tool_calls.clone(),
            _ => return Ok(0),
        };

        for call in &calls {
            debug!("Tool call: {} ({})", call.name, call.id);
            let output = self.tools.dispatch(call).await?;
            let content = output.render();
            self.check_size("Tool result", content.len())?;
            conversation.append(Message::tool_result(content, call));
        }

        Ok(calls.len())
    }

    /// Run a whole turn for `user_text`.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
    ) -> Result<TurnOutcome, EngineError> {
        self.enter_turn(conversation, Message::user(user_text));

        let mut state = TurnState::Assistant;
        let mut rounds = 0;

        loop {
            state = match state {
                TurnState::Assistant => {
                    self.run_assistant_step(conversation).await?;
                    route(conversation).into()
                }
                TurnState::Tools => {
                    if rounds >= self.limits.max_rounds {
                        error!("Turn exceeded max tool rounds ({})", self.limits.max_rounds);
                        return Err(EngineError::MaxIterationsExceeded);
                    }
                    rounds += 1;
                    debug!("Tool round {}/{}", rounds, self.limits.max_rounds);
                    self.run_tools_step(conversation).await?;
                    TurnState::Assistant
                }
                TurnState::Done => break,
            };
        }

        let answer = conversation
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        Ok(TurnOutcome { answer, rounds })
    }

    fn check_size(&self, what: &str, size: usize) -> Result<(), EngineError> {
        if size > self.limits.max_result_bytes {
            warn!(
                "{} exceeds size limit: {} bytes > {} bytes",
                what, size, self.limits.max_result_bytes
            );
            return Err(EngineError::ResultSizeExceeded {
                size,
                limit: self.limits.max_result_bytes,
            });
        }
        Ok(())
    }
}
