//! fetch-updates command

use anyhow::{Context, Result};
use chrono::Utc;
use spendings_core::{run_batch, BatchSummary, Config, Gateway};

use super::open_db;

pub async fn cmd_fetch_updates(config: &Config, no_encrypt: bool) -> Result<()> {
    let summary = fetch_updates(config, no_encrypt).await?;

    println!("📥 Processed {} message(s)", summary.received);
    println!("   Created: {}", summary.created);
    println!("   Updated: {}", summary.updated);
    println!("   Ignored: {}", summary.ignored);
    println!("   Reports sent: {}", summary.reports_sent);
    if summary.failed > 0 {
        println!("   ⚠️  Failed: {} (see log)", summary.failed);
    }

    Ok(())
}

/// Run one batch against the configured Telegram bot
pub async fn fetch_updates(config: &Config, no_encrypt: bool) -> Result<BatchSummary> {
    let gateway = Gateway::telegram(&config.telegram).context("Failed to set up Telegram")?;
    let db = open_db(config, no_encrypt)?;

    run_batch(&db, &gateway, Utc::now)
        .await
        .context("Failed to fetch updates")
}
