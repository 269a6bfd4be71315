mod commands;
mod config;
mod error;
mod events;
mod llm;
mod logging;
mod prompts;
mod session;
mod streaming;
#[cfg(test)]
mod testing;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::{CompletionService, GeminiClient};
use crate::logging::LogTarget;

#[derive(Parser)]
#[command(name = "mindmate")]
#[command(version)]
#[command(about = "Emotional-support chat companion for the terminal, backed by Gemini", long_about = None)]
struct Cli {
    /// Read configuration from this file instead of ~/.mindmate/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini model to use
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask { question: String },
    /// Streaming chat in the terminal, one line per message
    Chat,
    /// Full-screen app with the chatbot, help requests and questionnaire
    Tui,
    /// Write a config file with the default settings
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    // init creates the file, so it must not require one
    let mut config = match command {
        Commands::Init => Config::at(cli.config.as_deref()),
        _ => Config::load(cli.config.as_deref())?,
    };
    if let Some(model) = cli.model {
        config.model = model;
    }

    match command {
        Commands::Init => commands::init(&config),
        Commands::Ask { question } => {
            logging::init(LogTarget::Stderr, &config.log_level);
            commands::ask(connect(config)?, &question).await
        }
        Commands::Chat => {
            logging::init(LogTarget::Stderr, &config.log_level);
            commands::chat(connect(config)?).await
        }
        Commands::Tui => {
            let log_dir = config.log_dir();
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("Failed to create {}", log_dir.display()))?;
            logging::init(LogTarget::File(&log_dir), &config.log_level);
            ui::run(connect(config)?).await
        }
    }
}

/// Build the Gemini client, failing before any UI is shown
fn connect(config: Config) -> Result<Arc<dyn CompletionService>> {
    let client = GeminiClient::from_config(config).context("Cannot start without a Gemini API key")?;
    tracing::info!(model = client.model(), "gemini client ready");
    Ok(Arc::new(client))
}
