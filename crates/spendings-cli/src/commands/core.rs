//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` - Config file + environment + `--db` override
//! - `open_db` - Shared utility to open the database
//! - `cmd_migrate` - Create the database schema

use std::path::Path;

use anyhow::{Context, Result};
use spendings_core::config::DB_KEY_ENV;
use spendings_core::{Config, Database};

/// Load configuration once for the whole run
pub fn load_config(config_path: Option<&Path>, db_override: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config.apply_env_overrides();

    if let Some(db_path) = db_override {
        config.database.path = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?
            .to_string();
    }

    Ok(config)
}

/// Open the database, encrypted when a key is configured unless --no-encrypt
pub fn open_db(config: &Config, no_encrypt: bool) -> Result<Database> {
    let path = &config.database.path;
    let key = config.database.encryption_key.as_deref();

    if no_encrypt || key.is_none() {
        Database::new_unencrypted(path).context("Failed to open database (unencrypted)")
    } else {
        Database::new_with_key(path, key).context("Failed to open database")
    }
}

pub fn cmd_migrate(config: &Config, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", config.database.path);

    let db = open_db(config, no_encrypt)?;
    db.migrate().context("Failed to create schema")?;

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED");
    } else if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   ⚠️  Encryption: DISABLED (set {} to enable)", DB_KEY_ENV);
    }

    let stats = db.stats().context("Failed to read database stats")?;
    println!("   Tags: {}", stats.tags);
    println!("   Spendings: {}", stats.spendings);

    let tags = db.list_tags().context("Failed to list tags")?;
    if !tags.is_empty() {
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        println!("   Known tags: {}", names.join(", "));
    }

    println!("✅ Database ready");
    println!();
    println!("Next steps:");
    println!("  1. Set TELEGRAM_BOT_TOKEN");
    println!("  2. Process messages: spendings fetch-updates");

    Ok(())
}
