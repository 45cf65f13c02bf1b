//! Telegram Bot API gateway
//!
//! Long-polls `getUpdates` and replies with `sendMessage`. Both calls are
//! JSON POSTs to `{api_base}/bot{token}/{method}`; every response is wrapped
//! in `{ok, result, description}`.
//!
//! Only `message` and `edited_message` updates are requested. An edit carries
//! the original `message_id`, so reprocessing it updates the stored spending.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::MessageGateway;
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::models::InboundMessage;

/// Extra time on top of the long-poll timeout before the HTTP client gives up
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 10;

#[derive(Clone)]
pub struct TelegramGateway {
    http_client: Client,
    /// `{api_base}/bot{token}` (never logged)
    bot_url: String,
    poll_timeout_secs: u64,
    batch_limit: u32,
    /// Highest update id fetched so far, including updates without text
    last_seen: Arc<AtomicI64>,
}

impl TelegramGateway {
    /// Create a gateway for a bot token against an API base URL
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        Self::with_limits(
            api_base,
            token,
            crate::config::DEFAULT_POLL_TIMEOUT_SECS,
            crate::config::DEFAULT_BATCH_LIMIT,
        )
    }

    /// Create from configuration (fails if no bot token is set)
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        Self::with_limits(
            &config.api_base,
            config.token()?,
            config.poll_timeout_secs,
            config.batch_limit,
        )
    }

    fn with_limits(
        api_base: &str,
        token: &str,
        poll_timeout_secs: u64,
        batch_limit: u32,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(
                poll_timeout_secs + HTTP_TIMEOUT_MARGIN_SECS,
            ))
            .build()?;

        Ok(Self {
            http_client,
            bot_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            poll_timeout_secs,
            batch_limit: batch_limit.clamp(1, 100),
            last_seen: Arc::new(AtomicI64::new(i64::MIN)),
        })
    }

    /// POST a Bot API method and unwrap its `result`
    async fn call<P, T>(&self, method: &str, payload: &P) -> Result<T>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(format!("{}/{}", self.bot_url, method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        // Telegram sends the JSON envelope on 4xx as well, so read it first
        let body: ApiResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(Error::Http(e)),
            Err(_) => {
                return Err(Error::Telegram(format!(
                    "{} failed with HTTP {}",
                    method, status
                )))
            }
        };

        if !body.ok {
            return Err(Error::Telegram(format!(
                "{}: {}",
                method,
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status))
            )));
        }

        body.result
            .ok_or_else(|| Error::Telegram(format!("{}: response has no result", method)))
    }

    async fn get_updates(&self, request: &GetUpdatesRequest) -> Result<Vec<Update>> {
        self.call("getUpdates", request).await
    }
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    limit: u32,
    allowed_updates: &'static [&'static str],
}

const ALLOWED_UPDATES: &[&str] = &["message", "edited_message"];

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
    edited_message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

impl Update {
    /// The text message carried by this update, if any
    fn into_inbound(self) -> Option<InboundMessage> {
        let update_id = self.update_id;
        let message = self.message.or(self.edited_message)?;
        let text = message.text?;
        Some(InboundMessage::new(
            update_id,
            message.message_id,
            message.chat.id,
            text,
        ))
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn fetch_messages(&self) -> Result<Vec<InboundMessage>> {
        let updates = self
            .get_updates(&GetUpdatesRequest {
                offset: None,
                timeout: self.poll_timeout_secs,
                limit: self.batch_limit,
                allowed_updates: ALLOWED_UPDATES,
            })
            .await?;

        let received = updates.len();
        let highest = updates.iter().map(|u| u.update_id).max();
        if let Some(id) = highest {
            self.last_seen.fetch_max(id, Ordering::SeqCst);
        }

        let messages: Vec<InboundMessage> =
            updates.into_iter().filter_map(Update::into_inbound).collect();

        if messages.len() < received {
            debug!(
                skipped = received - messages.len(),
                "Dropped updates without text"
            );
        }

        // Nothing for the caller to confirm, so acknowledge the dropped ones here
        match highest {
            Some(id) if messages.is_empty() => self.confirm(id).await?,
            _ => {}
        }

        debug!(count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        debug!(chat_id, "Sent message");
        Ok(())
    }

    async fn confirm(&self, last_update_id: i64) -> Result<()> {
        // Fetching with a higher offset is how Telegram marks updates as read
        let last_update_id = last_update_id.max(self.last_seen.load(Ordering::SeqCst));
        let remaining = self
            .get_updates(&GetUpdatesRequest {
                offset: Some(last_update_id + 1),
                timeout: 0,
                limit: 1,
                allowed_updates: ALLOWED_UPDATES,
            })
            .await?;

        if !remaining.is_empty() {
            warn!(
                last_update_id,
                "New updates arrived during the batch; they will be fetched next run"
            );
        }
        Ok(())
    }
}
