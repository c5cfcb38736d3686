// Alfred
// Main entry point for the alfred binary

use alfred_engine::cli::{Cli, Command};
use alfred_engine::config::Config;
use alfred_engine::handlers::{handle_ask, handle_chat, handle_serve, handle_tools, OutputFormat};
use alfred_engine::telemetry::init_telemetry_with_level;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");
    tracing::info!("Alfred v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Serve { bind } => {
            tracing::info!("Starting chat server...");
            handle_serve(bind, &config).await
        }
        Command::Ask { text, session } => {
            tracing::info!("Asking on session {}: {}", session, text);
            handle_ask(text, session, &config, format).await
        }
        Command::Chat { session } => {
            tracing::info!("Interactive chat on session {}", session);
            handle_chat(session, &config, format).await
        }
        Command::Tools => handle_tools(&config, format).await,
    }
}
