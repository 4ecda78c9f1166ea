//! MedTutor CLI, the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP API
//! - `seed`      Load knowledge base entries from a JSON file
//! - `ask`       Chat from the terminal, one message or interactively
//! - `classify`  Show how a question would be classified
//! - `doctor`    Diagnose configuration, database and model backend
//! - `config`    Show, locate or initialise the config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "medtutor",
    about = "MedTutor: a retrieval-grounded medical education chatbot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: ~/.medtutor/config.toml)
    #[arg(short, long, global = true, env = "MEDTUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    #[command(alias = "gateway")]
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Upsert knowledge base entries from a JSON seed file
    Seed {
        #[arg(short, long, default_value = "data/medical_knowledge.json")]
        file: PathBuf,
    },

    /// Ask a question; without a message, start an interactive session
    Ask {
        message: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Classify a question without calling the model
    Classify { text: String },

    /// Diagnose system health
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Seed { file } => commands::seed::run(config_path, &file).await?,
        Commands::Ask { message, session } => {
            commands::ask::run(config_path, message, session).await?
        }
        Commands::Classify { text } => commands::classify::run(&text)?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Init => commands::config_cmd::init(config_path)?,
        },
    }

    Ok(())
}
