//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `tags` - Tag lookup and creation
//! - `spendings` - Spending CRUD, tag-association sync, date-range queries
//!
//! [`Database`] implements [`RecordStore`], which is how the update processor
//! and report generator reach it.

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{NewSpending, Spending, StoreStats, Tag};
use crate::store::RecordStore;

mod spendings;
mod tags;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Storage format for timestamps (UTC, second precision)
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"spendings-salt-1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Format a timestamp for storage
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored timestamp from column `idx`
pub(crate) fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    encrypted: bool,
}

impl Database {
    /// Open an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database, encrypted with SQLCipher when a passphrase is given
    ///
    /// The schema is not created here; call [`Database::migrate`] once
    /// (the `migrate-database` CLI command does).
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Runs on every new pooled connection; the key must come first
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        Ok(Self {
            pool,
            db_path: path.to_string(),
            encrypted: passphrase.is_some(),
        })
    }

    /// Create a fresh, migrated database in the temp directory (for testing)
    ///
    /// Uses a file rather than `:memory:` because every pooled connection
    /// would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "spendings_test_{}_{}.db",
            std::process::id(),
            id
        ));

        let _ = std::fs::remove_file(&path);

        let db = Self::new_unencrypted(&path.to_string_lossy())?;
        db.migrate()?;
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Whether the database was opened with an encryption key
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create the schema (idempotent)
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Tags (one per distinct hashtag, case-sensitive)
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE CHECK (name <> ''),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Spendings (one per source message)
            CREATE TABLE IF NOT EXISTS spendings (
                id INTEGER PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL UNIQUE,
                cost REAL NOT NULL,
                description TEXT NOT NULL,
                spent_at DATETIME NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_spendings_spent_at ON spendings(spent_at);

            -- Spending-Tag junction (many-to-many)
            CREATE TABLE IF NOT EXISTS spending_tags (
                spending_id INTEGER NOT NULL REFERENCES spendings(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (spending_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_spending_tags_tag ON spending_tags(tag_id);
            "#,
        )?;

        info!(path = %self.db_path, "Database schema initialized");
        Ok(())
    }

    /// Row counts of the main tables
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let tags = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        let spendings = conn.query_row("SELECT COUNT(*) FROM spendings", [], |row| row.get(0))?;
        Ok(StoreStats { tags, spendings })
    }
}

impl RecordStore for Database {
    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.get_tag_by_name(name)
    }

    fn create_tag(&self, name: &str) -> Result<Tag> {
        self.insert_tag(name)
    }

    fn create_spending(&self, spending: &NewSpending) -> Result<Spending> {
        self.insert_spending(spending)
    }

    fn find_spending_by_message_id(&self, message_id: i64) -> Result<Option<Spending>> {
        self.get_spending_by_message_id(message_id)
    }

    fn update_spending(&self, spending: &Spending) -> Result<()> {
        self.save_spending(spending)
    }

    fn sync_spending_tags(&self, spending_id: i64, tag_ids: &[i64]) -> Result<()> {
        self.replace_spending_tags(spending_id, tag_ids)
    }

    fn spendings_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Spending>> {
        self.list_spendings_between(from, to)
    }
}

#[cfg(test)]
mod tests;
