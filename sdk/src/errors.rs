//! Error types and handling
//!
//! This module provides the error types used throughout the Alfred engine.
//! All errors implement the `AlfredErrorExt` trait which provides user-friendly
//! hints, the error kind surfaced to callers, and whether a retry can help.
//!
//! # Security
//!
//! Hints are static strings. They never echo tool arguments, model output
//! or provider URLs back to the chat surface.

use thiserror::Error;

/// Broad category of a failed turn, as seen by the caller of the turn API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The model service was unreachable, timed out or returned malformed output
    ModelService,

    /// A requested tool failed or does not exist
    ToolInvocation,

    /// Configuration, prompt templates or tool bindings are missing or invalid
    Configuration,

    /// A turn guard (round limit, result size) stopped the loop
    Turn,

    /// Anything else (I/O, local network setup)
    Internal,
}

/// Trait for Alfred error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AlfredErrorExt {
    /// Returns the category this error belongs to
    fn kind(&self) -> ErrorKind;

    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display in the chat widget.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors may succeed when the same message is submitted again.
    /// Non-recoverable errors need a configuration change or restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration, prompts or datasets
/// - **Model service**: Provider failures and timeouts
/// - **Tool invocation**: Tool failures and unknown tool names
/// - **Turn guards**: Round limit and result size limit
///
/// # Examples
///
/// ```
/// use sdk::errors::{AlfredErrorExt, EngineError, ErrorKind};
///
/// let error = EngineError::ToolNotFound("teleport".to_string());
/// assert_eq!(error.kind(), ErrorKind::ToolInvocation);
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("missing system_prompt".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Model service errors
    #[error("Model service error: {0}")]
    ModelService(String),

    #[error("LLM call timed out")]
    LLMTimeout,

    // Tool errors
    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Agent loop errors
    #[error("Max iterations exceeded")]
    MaxIterationsExceeded,

    #[error("Result size exceeded: {size} bytes > {limit} bytes")]
    ResultSizeExceeded { size: usize, limit: usize },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl EngineError {
    /// Build a tool invocation error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

impl AlfredErrorExt for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::ModelService(_) | Self::LLMTimeout => ErrorKind::ModelService,
            Self::ToolInvocation { .. } | Self::ToolNotFound(_) => ErrorKind::ToolInvocation,
            Self::MaxIterationsExceeded | Self::ResultSizeExceeded { .. } => ErrorKind::Turn,
            Self::Network(_) => ErrorKind::Internal,
        }
    }

    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml and prompts.yaml for errors",

            Self::ModelService(_) => "Model service unavailable. Is Ollama running?",
            Self::LLMTimeout => "The model took too long to respond. Try again",

            Self::ToolInvocation { .. } => "A tool failed while answering. Try again",
            Self::ToolNotFound(_) => "The model asked for a tool that is not available",

            Self::MaxIterationsExceeded => "Question too complex. Try breaking it into smaller steps",
            Self::ResultSizeExceeded { .. } => "Result too large. Try a more specific question",

            Self::Network(_) => "Network operation failed. Check your connection",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
