//! Spendings CLI - Chat-driven expense tracker
//!
//! Usage:
//!   spendings migrate-database       Create the database schema
//!   spendings fetch-updates          Process new Telegram messages
//!   spendings report [--last-month]  Print a spending report

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.db.as_deref())?;

    match cli.command {
        Commands::FetchUpdates => commands::cmd_fetch_updates(&config, cli.no_encrypt).await,
        Commands::MigrateDatabase => commands::cmd_migrate(&config, cli.no_encrypt),
        Commands::Report { last_month } => {
            commands::cmd_report(&config, cli.no_encrypt, last_month)
        }
    }
}
