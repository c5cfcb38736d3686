//! Alfred Engine Library
//!
//! This library provides the core functionality of Alfred.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Prompt template loading
pub mod prompts;

/// LLM provider abstraction layer
pub mod llm;

/// Agent loop core module
pub mod agent;

/// Built-in tools
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// HTTP chat widget and JSON API
pub mod server;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
