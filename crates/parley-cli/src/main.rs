use anyhow::Result;
use clap::{Parser, Subcommand};
use parley_core::UserId;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod logging;
mod repl_helper;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - conversational assistant with a durable Q&A cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant in the terminal
    Chat {
        /// Conversation id; each id keeps its own context window
        #[arg(long, default_value_t = 1)]
        user_id: UserId,
    },
    /// Inspect or reset the Q&A cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the number of stored pairs and the last update time
    Stats,
    /// Find the stored answer closest to a question
    Lookup {
        /// Question text
        question: String,
    },
    /// Drop every stored pair
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the terminal quiet during chat; the log file still gets everything
    let console_level = match cli.command {
        Commands::Chat { .. } => LevelFilter::WARN,
        Commands::Cache { .. } => LevelFilter::INFO,
    };
    let _log_guard = logging::init(console_level);

    match cli.command {
        Commands::Chat { user_id } => commands::chat::run(user_id).await?,
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache::stats().await?,
            CacheAction::Lookup { question } => commands::cache::lookup(&question).await?,
            CacheAction::Clear => commands::cache::clear().await?,
        },
    }

    Ok(())
}
