//! ragline CLI: the main entry point.
//!
//! Commands:
//! - `ask`    runs one question through the two-stage pipeline
//! - `models` probes the backend and lists its advertised models

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "ragline: retrieval-augmented answering over your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question grounded in a set of passages
    Ask {
        /// The question to answer
        question: String,

        /// File of passages to ground the answer in, separated by blank
        /// lines; omit to run without document context
        #[arg(short, long)]
        passages: Option<PathBuf>,

        /// Also print the unrefined first-pass draft
        #[arg(long)]
        show_draft: bool,
    },

    /// Check backend health and list its advertised models
    Models,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask {
            question,
            passages,
            show_draft,
        } => commands::ask::run(question, passages, show_draft).await?,
        Commands::Models => commands::models::run().await?,
    }

    Ok(())
}
