//! Domain models for the spendings tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A category label created from a hashtag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// Case-sensitive, unique name (without the leading `#`)
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An expense recorded from a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spending {
    pub id: i64,
    /// Chat the message came from (immutable once set)
    pub chat_id: i64,
    /// Source message identifier, unique across spendings
    pub message_id: i64,
    pub cost: f64,
    /// Full original message text
    pub description: String,
    /// When the expense is considered to have occurred
    pub spent_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Spending {
    /// Names of the associated tags
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Fields needed to create a spending
#[derive(Debug, Clone, PartialEq)]
pub struct NewSpending {
    pub chat_id: i64,
    pub message_id: i64,
    pub cost: f64,
    pub description: String,
    pub spent_at: DateTime<Utc>,
}

/// Explicit bot commands recognized in chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotCommand {
    /// `/report` - current month so far
    Report,
    /// `/report_last_month` - previous full month
    ReportLastMonth,
}

impl BotCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::ReportLastMonth => "report_last_month",
        }
    }

    /// Parse a chat message into a command.
    ///
    /// Only the first whitespace-separated token counts, and a trailing
    /// `@botname` is ignored (`/report@my_bot`). Unknown commands yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        name.parse().ok()
    }
}

impl std::str::FromStr for BotCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "report" => Ok(Self::Report),
            "report_last_month" => Ok(Self::ReportLastMonth),
            _ => Err(format!("Unknown command: {}", s)),
        }
    }
}

impl std::fmt::Display for BotCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// A chat message delivered by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Gateway delivery sequence number (Telegram `update_id`)
    pub update_id: i64,
    pub message_id: i64,
    pub chat_id: i64,
    pub text: String,
    pub command: Option<BotCommand>,
}

impl InboundMessage {
    /// Build a message, detecting a bot command from the text
    pub fn new(update_id: i64, message_id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        let command = BotCommand::parse(&text);
        Self {
            update_id,
            message_id,
            chat_id,
            text,
            command,
        }
    }
}

/// Counts from one fetch-and-process cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub received: usize,
    pub created: usize,
    pub updated: usize,
    pub ignored: usize,
    pub reports_sent: usize,
    pub failed: usize,
}

/// Row counts for status output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub tags: i64,
    pub spendings: i64,
}
