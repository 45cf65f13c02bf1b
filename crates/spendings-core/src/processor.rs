//! Update processor
//!
//! Turns one inbound chat message into a stored spending:
//!
//! 1. Extract the price (no price means the message is ignored)
//! 2. Extract the date, defaulting to the processing instant
//! 3. Resolve or create a tag per distinct hashtag (failures skip that tag)
//! 4. Create the spending, or overwrite the one already stored for this message id
//! 5. Replace its tag associations with exactly the resolved set

use chrono::{DateTime, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::extract::{extract_date, extract_hashtags, extract_price};
use crate::models::{InboundMessage, NewSpending, Spending, Tag};
use crate::store::RecordStore;

/// What happened to a processed message
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// No price in the text (or a bot command); nothing stored
    Ignored,
    Created(Spending),
    Updated(Spending),
}

pub struct UpdateProcessor<S> {
    store: S,
}

impl<S: RecordStore> UpdateProcessor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Process one message at processing instant `now`
    ///
    /// Errors are persistence failures for this message only; tag lookup and
    /// creation failures are logged and the tag is left out.
    pub fn process_message(
        &self,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome> {
        if message.command.is_some() {
            return Ok(ProcessOutcome::Ignored);
        }

        let cost = match extract_price(&message.text) {
            Ok(cost) => cost,
            Err(e) => {
                debug!(message_id = message.message_id, "Ignoring message: {}", e);
                return Ok(ProcessOutcome::Ignored);
            }
        };

        let spent_at = extract_date(&message.text)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(now);

        let tags = self.resolve_tags(&extract_hashtags(&message.text));
        let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();

        let outcome = match self.store.find_spending_by_message_id(message.message_id)? {
            Some(mut existing) => {
                existing.cost = cost;
                existing.description = message.text.clone();
                existing.spent_at = spent_at;
                self.store.update_spending(&existing)?;
                self.store.sync_spending_tags(existing.id, &tag_ids)?;

                existing.tags = tags;
                debug!(
                    message_id = message.message_id,
                    spending_id = existing.id,
                    cost,
                    "Updated spending"
                );
                ProcessOutcome::Updated(existing)
            }
            None => {
                let mut created = self.store.create_spending(&NewSpending {
                    chat_id: message.chat_id,
                    message_id: message.message_id,
                    cost,
                    description: message.text.clone(),
                    spent_at,
                })?;
                self.store.sync_spending_tags(created.id, &tag_ids)?;

                created.tags = tags;
                debug!(
                    message_id = message.message_id,
                    chat_id = message.chat_id,
                    spending_id = created.id,
                    cost,
                    "Created spending"
                );
                ProcessOutcome::Created(created)
            }
        };

        Ok(outcome)
    }

    /// Look up or create each distinct tag, in order of first appearance
    fn resolve_tags(&self, names: &[String]) -> Vec<Tag> {
        let mut tags: Vec<Tag> = Vec::with_capacity(names.len());

        for name in names {
            if tags.iter().any(|t| &t.name == name) {
                continue;
            }

            let resolved = match self.store.find_tag_by_name(name) {
                Ok(Some(tag)) => Ok(tag),
                Ok(None) => self.store.create_tag(name),
                Err(e) => Err(e),
            };

            match resolved {
                Ok(tag) => tags.push(tag),
                Err(e) => warn!(tag = %name, "Skipping tag: {}", e),
            }
        }

        tags
    }
}
