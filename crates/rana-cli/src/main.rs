//! Rana CLI - Terminal host for schematisation sync and project files
//!
//! This binary supplies the prompt, progress, message and settings
//! collaborators the sync engine needs, on top of a plain terminal.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod host;
mod output;
mod output_types;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Dialogs block their thread, so a multi-threaded runtime is required
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(commands::execute(cli))
}
