//! Agent Core
//!
//! Caller-facing turn API. `submit` takes a session id and a user message,
//! runs one full turn on that session's conversation and returns the answer
//! together with a transcript snapshot.
//!
//! 1. Look up (or create) the session's conversation and lock it
//! 2. Enter the turn (system prompt on the first exchange only)
//! 3. Alternate model and tool steps until the model stops calling tools
//! 4. Return the final assistant message
//!
//! Failures propagate unchanged. Nothing is retried and nothing already
//! appended is rolled back.

use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::llm::ollama::OllamaProvider;
use crate::llm::{BoundModel, LLMProvider, Message};
use crate::prompts::PromptTemplates;
use crate::tools::ToolRegistry;

use super::router::{TurnLimits, TurnRouter};
use super::SessionStore;

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Turn ID, for log correlation
    pub turn_id: String,

    /// Session the turn ran on
    pub session_id: String,

    /// Final answer from the model
    pub answer: String,

    /// Number of tool rounds executed
    pub rounds: usize,

    /// Duration in milliseconds
    pub duration_ms: i64,

    /// Session transcript after the turn
    pub transcript: Vec<Message>,
}

/// Agent Core that owns the turn router and the sessions
pub struct AgentCore {
    /// Assistant/tools loop
    router: TurnRouter,

    /// Conversation state per session
    sessions: Arc<SessionStore>,
}

impl AgentCore {
    /// Create a new agent core
    pub fn new(router: TurnRouter, sessions: Arc<SessionStore>) -> Self {
        Self { router, sessions }
    }

    /// Build the agent from configuration: provider, tools, system prompt
    /// and turn limits.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let provider: Arc<dyn LLMProvider> = match config.llm.provider.as_str() {
            "ollama" => Arc::new(
                OllamaProvider::new(&config.llm.ollama.base_url, &config.llm.ollama.model)
                    .with_temperature(config.llm.ollama.temperature)
                    .with_timeout(timeout),
            ),
            other => {
                return Err(EngineError::Config(format!(
                    "Unknown LLM provider '{}'",
                    other
                )))
            }
        };

        let prompts = PromptTemplates::load(&config.agent.prompts_file)?;
        let system_prompt = prompts.get(&config.agent.system_prompt_key)?;

        let tools = Arc::new(ToolRegistry::from_config(&config.tools)?);
        let model = BoundModel::bind(provider, tools.specs())
            .with_timeout(timeout);

        let router = TurnRouter::new(model, tools, system_prompt).with_limits(TurnLimits {
            max_rounds: config.agent.max_rounds,
            max_result_bytes: config.agent.max_result_bytes,
        });

        info!(
            "Agent ready: provider={}, model={}, tools={:?}",
            config.llm.provider,
            config.llm.ollama.model,
            router.tools().names()
        );

        Ok(Self::new(router, Arc::new(SessionStore::new())))
    }

    pub fn router(&self) -> &TurnRouter {
        &self.router
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Process one user message on `session_id`.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<TurnResult, EngineError> {
        let turn_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("turn", turn_id = %turn_id, session_id = %session_id);

        async {
            let start_time = Instant::now();
            info!("Starting turn: {}", text);

            let mut conversation = self.sessions.lock(session_id).await;

            match self.router.run(&mut conversation, text).await {
                Ok(outcome) => {
                    let duration_ms = start_time.elapsed().as_millis() as i64;
                    info!(
                        "Turn completed in {}ms after {} tool rounds",
                        duration_ms, outcome.rounds
                    );

                    Ok(TurnResult {
                        turn_id: turn_id.clone(),
                        session_id: session_id.to_string(),
                        answer: outcome.answer,
                        rounds: outcome.rounds,
                        duration_ms,
                        transcript: conversation.snapshot(),
                    })
                }
                Err(e) => {
                    error!(
                        "Turn failed after {} messages: {}",
                        conversation.len(),
                        e
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
