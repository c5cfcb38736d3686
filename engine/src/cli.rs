//! CLI interface for Alfred
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Alfred, a tool-calling butler
///
/// Chats through a local Ollama model and calls web search, weather, model-hub
/// and guest-list tools when a question needs them.
#[derive(Parser, Debug)]
#[command(name = "alfred")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the chat widget and HTTP API
    Serve {
        /// Bind address (overrides [server] bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        text: String,

        /// Session to continue
        #[arg(long, short, default_value = "cli")]
        session: String,
    },

    /// Interactive chat on stdin (/reset clears the session, /exit quits)
    Chat {
        /// Session to use
        #[arg(long, short, default_value = "cli")]
        session: String,
    },

    /// List the tools bound to the model
    Tools,
}
