//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - serve: Run the chat widget and HTTP API
//! - ask: Run one turn and print the answer
//! - chat: Interactive turn loop on stdin
//! - tools: List the tools bound to the model

use anyhow::{Context, Result};
use sdk::errors::AlfredErrorExt;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{AgentCore, TurnResult};
use crate::config::Config;
use crate::llm::MessageRole;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn build_agent(config: &Config) -> Result<AgentCore> {
    AgentCore::from_config(config).context("Failed to initialize agent")
}

/// Serve the chat widget until Ctrl-C
pub async fn handle_serve(bind: Option<String>, config: &Config) -> Result<()> {
    let agent = Arc::new(build_agent(config)?);

    if !agent.router().model().provider().check_health().await {
        tracing::warn!(
            "Ollama at {} is not reachable; turns will fail until it is",
            config.llm.ollama.base_url
        );
    }

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    println!("Alfred is listening on http://{}", addr);
    crate::server::serve(agent, &addr)
        .await
        .context("HTTP server failed")
}

/// Run one turn and print the answer
pub async fn handle_ask(
    text: String,
    session: String,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let agent = build_agent(config)?;
    let result = agent
        .submit(&session, &text)
        .await
        .context("Turn failed")?;
    print_result(&result, format)
}

/// Interactive loop reading one user message per line
pub async fn handle_chat(session: String, config: &Config, format: OutputFormat) -> Result<()> {
    let agent = build_agent(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if format == OutputFormat::Text {
        println!("Alfred at your service. Type /reset to start over, /exit to leave.");
    }

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                agent.sessions().reset(&session).await;
                println!("Session '{}' cleared.", session);
                continue;
            }
            _ => {}
        }

        match agent.submit(&session, line).await {
            Ok(result) => print_result(&result, format)?,
            // A failed turn keeps its partial messages; the next line continues from there
            Err(e) => {
                match format {
                    OutputFormat::Text => {
                        eprintln!("✗ {}", e);
                        eprintln!("  {}", e.user_hint());
                    }
                    OutputFormat::Json => {
                        let output = json!({
                            "status": "failed",
                            "error": e.to_string(),
                            "hint": e.user_hint(),
                        });
                        println!("{}", serde_json::to_string(&output)?);
                    }
                }
            }
        }
    }

    Ok(())
}

/// List bound tools
pub async fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let agent = build_agent(config)?;
    let specs = agent.router().model().tools();

    match format {
        OutputFormat::Text => {
            if specs.is_empty() {
                println!("No tools enabled.");
            }
            for spec in specs {
                println!("  {:<22} {}", spec.name, spec.description);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(specs)?);
        }
    }
    Ok(())
}

fn print_result(result: &TurnResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", result.answer);
            tracing::debug!(
                "Turn {} took {}ms, {} tool rounds",
                result.turn_id,
                result.duration_ms,
                result.rounds
            );
        }
        OutputFormat::Json => {
            // Tool results of this turn only
            let mut tools_used: Vec<&str> = result
                .transcript
                .iter()
                .rev()
                .take_while(|m| m.role != MessageRole::User)
                .filter(|m| m.role == MessageRole::Tool)
                .filter_map(|m| m.name.as_deref())
                .collect();
            tools_used.reverse();
            let output = json!({
                "status": "completed",
                "turn_id": result.turn_id,
                "session_id": result.session_id,
                "answer": result.answer,
                "rounds": result.rounds,
                "duration_ms": result.duration_ms,
                "tools_used": tools_used,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
