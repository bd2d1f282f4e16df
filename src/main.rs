//! Main entry point for the book translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod core;

use cli::commands::Commands;

/// Book Translator - client for the book translation service
#[derive(Parser, Debug)]
#[command(name = "book-translator", version, about, long_about = None)]
struct Args {
    /// API key for the backend (optional, defaults to TRANSLATOR_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    let log_level = if std::env::var("RUST_LOG").is_ok() {
        std::env::var("RUST_LOG").unwrap()
    } else {
        "info".to_string()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        std::env::set_var("TRANSLATOR_API_KEY", api_key);
    }

    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    // Execute command
    match args.command {
        Some(Commands::Translate {
            file,
            language,
            output,
            api_key,
        }) => {
            cli::commands::handle_translate(file, language, output, api_key).await?;
        }
        Some(Commands::Status { task_id }) => {
            cli::commands::handle_status(task_id).await?;
        }
        Some(Commands::Download { task_id, output }) => {
            cli::commands::handle_download(task_id, output).await?;
        }
        Some(Commands::Settings {
            api_key,
            language,
            max_input_tokens,
            max_output_tokens,
            max_requests_per_minute,
            max_tokens_per_minute,
        }) => {
            cli::commands::handle_settings(
                api_key,
                language,
                max_input_tokens,
                max_output_tokens,
                max_requests_per_minute,
                max_tokens_per_minute,
            )
            .await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
