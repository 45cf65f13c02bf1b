//! CLI argument definitions using clap
//!
//! This module contains the clap structs for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendings - Track expenses posted to a Telegram chat
#[derive(Parser)]
#[command(name = "spendings")]
#[command(about = "Chat-driven spendings tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides config file and DATABASE_URL)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: ~/.config/spendings/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ignore any configured encryption key and open the database unencrypted
    ///
    /// By default the database is encrypted with SQLCipher when
    /// SPENDINGS_DB_KEY (or database.encryption_key) is set.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch new chat messages, record spendings and answer report commands
    FetchUpdates,

    /// Create the database schema
    MigrateDatabase,

    /// Print a spending report
    Report {
        /// Report the previous calendar month instead of the current one
        #[arg(long)]
        last_month: bool,
    },
}
