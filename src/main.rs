mod backend;
mod cli;
mod conversation_state;
mod error;
mod gemini_client;
mod ollama_client;
mod router;
mod settings;
#[cfg(test)]
mod test_support;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use crate::backend::Backend;
use crate::cli::chat::ChatContext;
use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: ChatOptions,
}

#[derive(clap::Args)]
struct ChatOptions {
    /// Input to send to the chat
    #[arg(short, long)]
    input: Option<String>,

    /// Backend to answer with (gemini or ollama)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Ollama model to use for the local backend
    #[arg(short, long)]
    model: Option<String>,

    /// Accept all prompts without asking
    #[arg(short, long)]
    yes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        #[command(flatten)]
        options: ChatOptions,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let options = match cli.command {
        Some(Commands::Chat { options }) => options,
        None => cli.options,
    };

    let log_level = if options.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Dual Chat CLI");

    let mut settings = Settings::load()?;
    if let Some(backend) = options.backend {
        settings.default_backend = backend;
    }
    if let Some(model) = options.model.filter(|m| !m.trim().is_empty()) {
        settings.ollama_model = model;
    }
    debug!("Resolved settings: {:?}", settings);

    let interactive = options.input.is_none();
    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        options.input,
        interactive,
        options.yes,
        settings,
    );
    chat_context.run().await
}
