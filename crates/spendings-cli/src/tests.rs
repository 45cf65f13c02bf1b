//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::{TimeZone, Utc};
use clap::Parser;
use spendings_core::config::{Config, DatabaseConfig, TelegramConfig};
use spendings_core::db::Database;
use spendings_core::test_utils::{MockTelegramServer, TEST_TOKEN};
use spendings_core::ReportPeriod;
use tempfile::TempDir;

use crate::cli::{Cli, Commands};
use crate::commands;

/// Config pointing at a fresh database file in `dir`
fn test_config(dir: &TempDir, api_base: &str) -> Config {
    Config {
        database: DatabaseConfig {
            path: dir.path().join("spendings.db").to_string_lossy().into_owned(),
            encryption_key: None,
        },
        telegram: TelegramConfig {
            bot_token: Some(TEST_TOKEN.to_string()),
            api_base: api_base.to_string(),
            poll_timeout_secs: 0,
            batch_limit: 100,
        },
    }
}

fn migrated_config(dir: &TempDir, api_base: &str) -> Config {
    let config = test_config(dir, api_base);
    commands::cmd_migrate(&config, true).unwrap();
    config
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_subcommands() {
    let cli = Cli::try_parse_from(["spendings", "fetch-updates"]).unwrap();
    assert!(matches!(cli.command, Commands::FetchUpdates));

    let cli = Cli::try_parse_from(["spendings", "migrate-database", "--db", "/tmp/x.db"]).unwrap();
    assert!(matches!(cli.command, Commands::MigrateDatabase));
    assert_eq!(cli.db.unwrap().to_str(), Some("/tmp/x.db"));

    let cli = Cli::try_parse_from(["spendings", "-v", "report", "--last-month"]).unwrap();
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Report { last_month: true }));
}

#[test]
fn test_parse_rejects_unknown_or_missing_command() {
    assert!(Cli::try_parse_from(["spendings"]).is_err());
    assert!(Cli::try_parse_from(["spendings", "frobnicate"]).is_err());
}

// ========== Config Tests ==========

#[test]
fn test_load_config_with_db_override() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[database]\npath = \"from-file.db\"\n\n[telegram]\npoll_timeout_secs = 3\n",
    )
    .unwrap();

    let override_path = dir.path().join("override.db");
    let config = commands::load_config(Some(config_path.as_path()), Some(override_path.as_path())).unwrap();

    assert_eq!(config.database.path, override_path.to_string_lossy());
    assert_eq!(config.telegram.poll_timeout_secs, 3);
}

#[test]
fn test_load_config_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(commands::load_config(Some(missing.as_path()), None).is_err());
}

// ========== Migrate Command Tests ==========

#[test]
fn test_cmd_migrate_creates_schema() {
    let dir = TempDir::new().unwrap();
    let config = migrated_config(&dir, "http://unused");

    let db = Database::new_unencrypted(&config.database.path).unwrap();
    let conn = db.conn().unwrap();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('tags', 'spendings', 'spending_tags')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 3);

    // Running it again is harmless
    commands::cmd_migrate(&config, true).unwrap();
}

#[test]
fn test_open_db_uses_configured_key() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, "http://unused");
    config.database.encryption_key = Some("cli-secret".into());

    commands::cmd_migrate(&config, false).unwrap();
    let db = commands::open_db(&config, false).unwrap();
    assert!(db.is_encrypted());
    assert_eq!(db.stats().unwrap().spendings, 0);

    // --no-encrypt opens without the key, which cannot read the file
    let plain = commands::open_db(&config, true)
        .ok()
        .map(|db| (db.is_encrypted(), db.stats().is_ok()));
    assert!(!matches!(plain, Some((_, true))));
    if let Some((encrypted, _)) = plain {
        assert!(!encrypted);
    }
}

// ========== Fetch Command Tests ==========

#[tokio::test]
async fn test_fetch_updates_end_to_end() {
    let server = MockTelegramServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = migrated_config(&dir, &server.url());

    server.push_text_message(1, 10, 5, "Lunch 15.50 #food #work");
    server.push_text_message(2, 11, 5, "Lunch #food");
    server.push_non_text_message(3, 12, 5);

    let summary = commands::fetch_updates(&config, true).await.unwrap();
    assert_eq!(summary.received, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.ignored, 1);
    assert!(server.pending_update_ids().is_empty());

    // Edit the first message and ask for a report
    server.push_edited_message(4, 10, 5, "Lunch 18 #food");
    server.push_text_message(5, 13, 5, "/report");

    let summary = commands::fetch_updates(&config, true).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.reports_sent, 1);

    let sent = server.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 5);
    assert!(sent[0].1.starts_with("Spending report for current month:\n\nfood: 18.00\n"));

    let db = commands::open_db(&config, true).unwrap();
    let spending = db.get_spending_by_message_id(10).unwrap().unwrap();
    assert_eq!(spending.cost, 18.0);
    assert_eq!(spending.tag_names(), vec!["food"]);
}

#[tokio::test]
async fn test_fetch_updates_requires_token() {
    let dir = TempDir::new().unwrap();
    let mut config = migrated_config(&dir, "http://unused");
    config.telegram.bot_token = None;

    assert!(commands::fetch_updates(&config, true).await.is_err());
}

#[tokio::test]
async fn test_fetch_updates_bad_token_fails() {
    let server = MockTelegramServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = migrated_config(&dir, &server.url());
    config.telegram.bot_token = Some("wrong".into());

    let err = commands::fetch_updates(&config, true).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Unauthorized"));
}

// ========== Report Command Tests ==========

#[test]
fn test_render_report_empty() {
    let db = Database::in_memory().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();

    let text = commands::render_report(&db, ReportPeriod::CurrentMonth, now).unwrap();
    assert_eq!(text, "Spending report for current month:\n\nTotal: 0.00");

    let text = commands::render_report(&db, ReportPeriod::LastMonth, now).unwrap();
    assert_eq!(text, "Spending report for last month:\n\nTotal: 0.00");
}

#[test]
fn test_cmd_report_runs() {
    let dir = TempDir::new().unwrap();
    let config = migrated_config(&dir, "http://unused");

    assert!(commands::cmd_report(&config, true, false).is_ok());
    assert!(commands::cmd_report(&config, true, true).is_ok());
}

#[test]
fn test_cmd_report_without_schema_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "http://unused");

    assert!(commands::cmd_report(&config, true, false).is_err());
}
