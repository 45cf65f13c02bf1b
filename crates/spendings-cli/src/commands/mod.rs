//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (load_config, open_db) and migrate-database
//! - `fetch` - fetch-updates: one Telegram batch
//! - `reports` - report: print a spending report

pub mod core;
pub mod fetch;
pub mod reports;

// Re-export command functions for main.rs
pub use core::*;
pub use fetch::*;
pub use reports::*;
