use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use parley_application::{ConversationOrchestrator, OrchestratorSettings, ReplySink, SinkError, deliver};
use parley_core::UserId;
use parley_infrastructure::ConfigService;
use parley_interaction::{OpenAiCompletionClient, RetryingCompletion};
use rustyline::Editor;
use rustyline::error::ReadlineError;

use super::open_cache;
use crate::repl_helper::ReplHelper;

/// Prints outbound chunks to the terminal.
struct TerminalSink;

#[async_trait]
impl ReplySink for TerminalSink {
    async fn send(&self, message: &str) -> Result<(), SinkError> {
        for line in message.lines() {
            println!("{}", line.bright_blue());
        }
        Ok(())
    }
}

pub async fn run(user_id: UserId) -> Result<()> {
    // ===== Backend Initialization =====
    let config_service = ConfigService::new();
    let (config, cache) = open_cache(&config_service).await?;
    let secret = config_service
        .load_openai_secret()
        .context("OpenAI credentials are required for chat")?;

    let client = OpenAiCompletionClient::from_config(&secret, &config)?;
    let completion = RetryingCompletion::from_config(client, &config);
    let orchestrator = ConversationOrchestrator::new(
        Arc::new(completion),
        Arc::new(cache),
        OrchestratorSettings::from(&config),
    );
    tracing::info!(user_id, model = %config.model, "Chat session started");

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new()));

    println!("{}", "=== Parley ===".bright_magenta().bold());
    println!(
        "{}",
        "Type a message to chat, '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();

    let sink = TerminalSink;

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let Some(reply) = orchestrator.dispatch(user_id, trimmed).await else {
                    continue;
                };
                if let Err(e) = deliver(&reply, &sink).await {
                    eprintln!("{}", format!("Error: {e}").red());
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}
