//! Minetrack CLI - browse the mining permit directory offline and queue
//! field reports from the terminal.

mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::browse::run_browse;
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::draft::run_draft;
use crate::commands::filters::run_filters;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "minetrack=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        command,
        db_path,
        profile,
        offline,
    } = Cli::parse();
    let context = || CliContext::resolve(db_path.clone(), profile.as_deref(), offline);

    match command {
        Commands::Config { command } => run_config(command, profile.as_deref()),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Sync { page_size, json } => run_sync(&context()?, page_size, json).await,
        Commands::Status { json } => run_status(&context()?, json).await,
        Commands::Browse {
            category,
            filters,
            json,
        } => run_browse(&context()?, category, filters, json).await,
        Commands::Filters { category, json } => run_filters(&context()?, category, json).await,
        Commands::Draft { command } => run_draft(&context()?, command).await,
    }
}
