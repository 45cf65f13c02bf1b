//! Record store abstraction
//!
//! The update processor and report generator only talk to persistence through
//! [`RecordStore`]. Two implementations exist:
//!
//! - [`crate::db::Database`] - SQLite (optionally SQLCipher-encrypted)
//! - [`MemoryStore`] - in-process maps with failure injection, for tests
//!
//! "Not found" is `Ok(None)`, never an error.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{NewSpending, Spending, Tag};

mod memory;

pub use memory::MemoryStore;

/// Persistence operations for tags and spendings
///
/// Every operation is atomic on its own; there is no cross-call transaction.
pub trait RecordStore {
    /// Find a tag by exact (case-sensitive) name
    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Create a tag. Fails if the name already exists.
    fn create_tag(&self, name: &str) -> Result<Tag>;

    /// Create a spending with no tags
    fn create_spending(&self, spending: &NewSpending) -> Result<Spending>;

    /// Find a spending by its source message identifier, tags populated
    fn find_spending_by_message_id(&self, message_id: i64) -> Result<Option<Spending>>;

    /// Persist cost, description and effective date of an existing spending
    ///
    /// `chat_id` and `message_id` are never changed.
    fn update_spending(&self, spending: &Spending) -> Result<()>;

    /// Replace the tag associations of a spending with exactly `tag_ids`
    fn sync_spending_tags(&self, spending_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Spendings with `from <= spent_at <= to`, tags populated, oldest first
    fn spendings_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Spending>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        (**self).find_tag_by_name(name)
    }

    fn create_tag(&self, name: &str) -> Result<Tag> {
        (**self).create_tag(name)
    }

    fn create_spending(&self, spending: &NewSpending) -> Result<Spending> {
        (**self).create_spending(spending)
    }

    fn find_spending_by_message_id(&self, message_id: i64) -> Result<Option<Spending>> {
        (**self).find_spending_by_message_id(message_id)
    }

    fn update_spending(&self, spending: &Spending) -> Result<()> {
        (**self).update_spending(spending)
    }

    fn sync_spending_tags(&self, spending_id: i64, tag_ids: &[i64]) -> Result<()> {
        (**self).sync_spending_tags(spending_id, tag_ids)
    }

    fn spendings_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Spending>> {
        (**self).spendings_between(from, to)
    }
}
