//! Mock gateway for testing
//!
//! Queued messages are redelivered on every fetch until confirmed, like
//! Telegram's update queue. Sent replies are recorded for assertions.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::MessageGateway;
use crate::error::{Error, Result};
use crate::models::InboundMessage;

/// A reply captured by [`MockGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Default)]
struct MockState {
    pending: Vec<InboundMessage>,
    sent: Vec<SentMessage>,
    confirmed: Option<i64>,
    fail_fetch: bool,
    fail_send: bool,
}

/// In-process gateway; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway with messages already queued
    pub fn with_messages(messages: Vec<InboundMessage>) -> Self {
        let gateway = Self::new();
        gateway.lock().pending = messages;
        gateway
    }

    /// Queue a message for the next fetch
    pub fn push_message(&self, message: InboundMessage) {
        self.lock().pending.push(message);
    }

    /// Replies sent so far
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    /// Highest acknowledged update id
    pub fn last_confirmed(&self) -> Option<i64> {
        self.lock().confirmed
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.lock().fail_send = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    async fn fetch_messages(&self) -> Result<Vec<InboundMessage>> {
        let state = self.lock();
        if state.fail_fetch {
            return Err(Error::Telegram("Mock fetch failure".into()));
        }
        Ok(state.pending.clone())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_send {
            return Err(Error::Telegram("Mock send failure".into()));
        }
        state.sent.push(SentMessage {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn confirm(&self, last_update_id: i64) -> Result<()> {
        let mut state = self.lock();
        state.pending.retain(|m| m.update_id > last_update_id);
        state.confirmed = Some(state.confirmed.map_or(last_update_id, |c| c.max(last_update_id)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_redelivered_until_confirmed() {
        let gateway = MockGateway::with_messages(vec![
            InboundMessage::new(1, 10, 5, "Lunch 10"),
            InboundMessage::new(2, 11, 5, "Dinner 20"),
        ]);

        assert_eq!(gateway.fetch_messages().await.unwrap().len(), 2);
        assert_eq!(gateway.fetch_messages().await.unwrap().len(), 2);

        gateway.confirm(1).await.unwrap();
        let remaining = gateway.fetch_messages().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].update_id, 2);
        assert_eq!(gateway.last_confirmed(), Some(1));
    }

    #[tokio::test]
    async fn test_records_sent_messages() {
        let gateway = MockGateway::new();
        let clone = gateway.clone();

        clone.send_message(5, "hello").await.unwrap();
        assert_eq!(
            gateway.sent_messages(),
            vec![SentMessage {
                chat_id: 5,
                text: "hello".into()
            }]
        );

        gateway.set_fail_send(true);
        assert!(gateway.send_message(5, "again").await.is_err());
        assert_eq!(gateway.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let gateway = MockGateway::new();
        gateway.set_fail_fetch(true);
        assert!(gateway.fetch_messages().await.is_err());
    }
}
