//! Tosk CLI
//!
//! Command-line interface for Tosk - offline-first todo management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tosk_core::SyncEngine;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tosk")]
#[command(about = "Tosk - Offline-first todo management")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new todo (works offline)
    #[command(alias = "create")]
    Add {
        /// Todo title
        title: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Path to an image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// List all todos
    #[command(alias = "ls")]
    List,
    /// Show todo details
    Show {
        /// Todo ID (full UUID or prefix)
        id: String,
    },
    /// Toggle a todo's completion state
    Toggle {
        /// Todo ID (full UUID or prefix)
        id: String,
    },
    /// Delete a todo
    #[command(alias = "rm")]
    Delete {
        /// Todo ID (full UUID or prefix)
        id: String,
    },
    /// Re-queue a todo whose sync failed
    Retry {
        /// Todo ID (full UUID or prefix)
        id: String,
    },
    /// Sync with the remote server
    Sync,
    /// Show status (pending actions, storage, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, retry_limit, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    init_logging();

    // Config commands don't need the engine
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let mut engine = SyncEngine::open()?;

    match cli.command {
        Commands::Add {
            title,
            description,
            image,
        } => commands::todo::add(&mut engine, title, description, image, &output),
        Commands::List => commands::todo::list(&engine, &output),
        Commands::Show { id } => commands::todo::show(&engine, id, &output),
        Commands::Toggle { id } => commands::todo::toggle(&mut engine, id, &output),
        Commands::Delete { id } => commands::todo::delete(&mut engine, id, &output),
        Commands::Retry { id } => commands::todo::retry(&mut engine, id, &output),
        Commands::Sync => commands::sync::sync(engine, &output).await,
        Commands::Status => commands::status::show(&engine, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Initialize stderr logging, controlled by TOSK_LOG
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env("TOSK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
