//! Messaging gateway abstraction
//!
//! # Architecture
//!
//! - `MessageGateway` trait: fetch inbound messages, send replies, acknowledge
//! - `Gateway` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `TelegramGateway` (Bot API long polling), `MockGateway`

mod mock;
mod telegram;

pub use mock::{MockGateway, SentMessage};
pub use telegram::TelegramGateway;

use async_trait::async_trait;

use crate::config::TelegramConfig;
use crate::error::Result;
use crate::models::InboundMessage;

/// Transport for chat messages
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Fetch the next batch of inbound messages, in delivery order
    async fn fetch_messages(&self) -> Result<Vec<InboundMessage>>;

    /// Send a text reply to a chat
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Acknowledge every message up to and including `last_update_id`
    /// so it is not delivered again
    async fn confirm(&self, last_update_id: i64) -> Result<()>;
}

#[derive(Clone)]
pub enum Gateway {
    /// Telegram Bot API
    Telegram(TelegramGateway),
    /// In-process gateway for testing
    Mock(MockGateway),
}

impl Gateway {
    /// Create a Telegram gateway (fails if no bot token is configured)
    pub fn telegram(config: &TelegramConfig) -> Result<Self> {
        Ok(Gateway::Telegram(TelegramGateway::from_config(config)?))
    }

    /// Create an empty mock gateway
    pub fn mock() -> Self {
        Gateway::Mock(MockGateway::new())
    }
}

#[async_trait]
impl MessageGateway for Gateway {
    async fn fetch_messages(&self) -> Result<Vec<InboundMessage>> {
        match self {
            Gateway::Telegram(g) => g.fetch_messages().await,
            Gateway::Mock(g) => g.fetch_messages().await,
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        match self {
            Gateway::Telegram(g) => g.send_message(chat_id, text).await,
            Gateway::Mock(g) => g.send_message(chat_id, text).await,
        }
    }

    async fn confirm(&self, last_update_id: i64) -> Result<()> {
        match self {
            Gateway::Telegram(g) => g.confirm(last_update_id).await,
            Gateway::Mock(g) => g.confirm(last_update_id).await,
        }
    }
}
