//! devicesync CLI
//!
//! Keeps local device records and an EdgeX-style edge platform in sync for
//! one pool.
//!
//! # Commands
//!
//! - `run` - Run the controllers and syncers until interrupted (default)
//! - `sync-once` - Run a single sync round per kind and print a summary

mod commands;
mod options;

use clap::{Parser, Subcommand};
use options::EngineOptions;
use tracing_subscriber::EnvFilter;

/// Device synchronization between a pool's records and its edge platform.
#[derive(Parser)]
#[command(name = "devicesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: EngineOptions,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run until interrupted
    Run,

    /// Run one sync round per kind and exit
    SyncOnce,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = commands::connect(&cli.options).await?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(engine).await?,
        Commands::SyncOnce => commands::sync_once::run(&engine).await?,
    }

    Ok(())
}
