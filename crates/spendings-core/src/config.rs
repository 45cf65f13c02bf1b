//! Runtime configuration
//!
//! Loaded once by the CLI and handed to constructors. Sources, lowest to
//! highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, else `~/.config/spendings/config.toml` if present)
//! 3. Environment variables (see [`Config::apply_env_overrides`])
//!
//! ```toml
//! [database]
//! path = "/var/lib/spendings/spendings.db"
//!
//! [telegram]
//! bot_token = "123456:ABC..."
//! poll_timeout_secs = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Bot token from @BotFather
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Database file path
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Passphrase for SQLCipher encryption
pub const DB_KEY_ENV: &str = "SPENDINGS_DB_KEY";
/// Bot API base URL (tests point this at a mock server)
pub const API_BASE_ENV: &str = "TELEGRAM_API_BASE";

pub const DEFAULT_DATABASE_PATH: &str = "spendings.db";
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BATCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    /// Encrypt the database with a key derived from this passphrase
    pub encryption_key: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
            encryption_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
    /// Long-poll timeout for `getUpdates`
    pub poll_timeout_secs: u64,
    /// Maximum updates per batch (Telegram caps this at 100)
    pub batch_limit: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl TelegramConfig {
    /// The bot token, or a configuration error if none is set
    pub fn token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No Telegram bot token configured (set {} or telegram.bot_token)",
                    BOT_TOKEN_ENV
                ))
            })
    }
}

impl Config {
    /// Load from an explicit file, the default location, or defaults
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .inspect_err(|e| warn!(path = %path.display(), "Failed to read config file: {}", e))?;
        debug!(path = %path.display(), "Loaded config file");
        Self::parse(&content)
    }

    /// Parse TOML content; missing sections and keys take defaults
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply `TELEGRAM_BOT_TOKEN`, `DATABASE_URL`, `SPENDINGS_DB_KEY` and
    /// `TELEGRAM_API_BASE` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (empty values are ignored)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = get(BOT_TOKEN_ENV) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(path) = get(DATABASE_URL_ENV) {
            self.database.path = path;
        }
        if let Some(key) = get(DB_KEY_ENV) {
            self.database.encryption_key = Some(key);
        }
        if let Some(base) = get(API_BASE_ENV) {
            self.telegram.api_base = base;
        }
    }
}

/// `<config dir>/spendings/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spendings").join("config.toml"))
}
