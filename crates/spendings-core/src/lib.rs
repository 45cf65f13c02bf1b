//! Spendings Core Library
//!
//! Shared functionality for the chat-driven spendings tracker:
//! - Text extractors for prices, dates and hashtags
//! - Record store trait with SQLite (optionally encrypted) and in-memory backends
//! - Update processor that upserts spendings by source message
//! - Monthly per-tag spending reports
//! - Messaging gateway trait with a Telegram Bot API implementation
//! - Batch runner tying the above into one fetch-process-reply cycle

pub mod batch;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod models;
pub mod processor;
pub mod report;
pub mod store;

/// Test utilities including mock Telegram server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use batch::run_batch;
pub use config::{Config, DatabaseConfig, TelegramConfig};
pub use db::Database;
pub use error::{Error, Result};
pub use extract::{extract_date, extract_hashtags, extract_price, ExtractError};
pub use gateway::{Gateway, MessageGateway, MockGateway, SentMessage, TelegramGateway};
pub use models::{
    BatchSummary, BotCommand, InboundMessage, NewSpending, Spending, StoreStats, Tag,
};
pub use processor::{ProcessOutcome, UpdateProcessor};
pub use report::{build_report, ReportPeriod, SpendingReport};
pub use store::{MemoryStore, RecordStore};
