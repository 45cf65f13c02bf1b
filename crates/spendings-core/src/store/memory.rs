//! In-memory record store for testing
//!
//! Mirrors the SQLite store's behavior (unique tag names, unique message ids,
//! full-replace tag sync) without touching disk. Individual operations can be
//! told to fail so error paths of the processor can be exercised.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::RecordStore;
use crate::error::{Error, Result};
use crate::models::{NewSpending, Spending, Tag};

#[derive(Debug, Clone)]
struct StoredSpending {
    spending: Spending,
    tag_ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct State {
    tags: BTreeMap<i64, Tag>,
    spendings: BTreeMap<i64, StoredSpending>,
    next_tag_id: i64,
    next_spending_id: i64,
    fail_create_spending: bool,
    fail_update_spending: bool,
    fail_sync_tags: bool,
    fail_tag_names: HashSet<String>,
    fail_lookup_names: HashSet<String>,
}

/// Record store backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_spending` fail
    pub fn set_error_on_create(&self, fail: bool) {
        self.lock().fail_create_spending = fail;
    }

    /// Make `update_spending` fail
    pub fn set_error_on_update(&self, fail: bool) {
        self.lock().fail_update_spending = fail;
    }

    /// Make `sync_spending_tags` fail
    pub fn set_error_on_sync(&self, fail: bool) {
        self.lock().fail_sync_tags = fail;
    }

    /// Make creating a tag with this name fail
    pub fn fail_tag_creation(&self, name: &str) {
        self.lock().fail_tag_names.insert(name.to_string());
    }

    /// Make looking up a tag with this name fail
    pub fn fail_tag_lookup(&self, name: &str) {
        self.lock().fail_lookup_names.insert(name.to_string());
    }

    /// Insert a spending directly, creating any missing tags by name.
    ///
    /// Used to seed report fixtures.
    pub fn insert_spending(&self, spending: &NewSpending, tag_names: &[&str]) -> Result<Spending> {
        let created = self.create_spending(spending)?;
        let mut tag_ids = Vec::new();
        for name in tag_names {
            let tag = match self.find_tag_by_name(name)? {
                Some(tag) => tag,
                None => self.create_tag(name)?,
            };
            tag_ids.push(tag.id);
        }
        self.sync_spending_tags(created.id, &tag_ids)?;
        self.find_spending_by_message_id(created.message_id)?
            .ok_or_else(|| Error::NotFound(format!("spending {}", created.id)))
    }

    /// All tags, ordered by id
    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.values().cloned().collect()
    }

    /// Number of stored spendings
    pub fn spending_count(&self) -> usize {
        self.lock().spendings.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn hydrate(&self, stored: &StoredSpending) -> Spending {
        let mut spending = stored.spending.clone();
        spending.tags = stored
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        spending
    }
}

impl RecordStore for MemoryStore {
    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let state = self.lock();
        if state.fail_lookup_names.contains(name) {
            return Err(Error::Store(format!("Failed to look up tag {}", name)));
        }
        Ok(state.tags.values().find(|t| t.name == name).cloned())
    }

    fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut state = self.lock();

        if state.fail_tag_names.contains(name) {
            return Err(Error::Store(format!("Failed to create tag {}", name)));
        }
        if name.is_empty() {
            return Err(Error::InvalidData("Tag name must not be empty".into()));
        }
        if state.tags.values().any(|t| t.name == name) {
            return Err(Error::Store(format!("Tag {} already exists", name)));
        }

        state.next_tag_id += 1;
        let tag = Tag {
            id: state.next_tag_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    fn create_spending(&self, new: &NewSpending) -> Result<Spending> {
        let mut state = self.lock();

        if state.fail_create_spending {
            return Err(Error::Store("Failed to create spending".into()));
        }
        if state
            .spendings
            .values()
            .any(|s| s.spending.message_id == new.message_id)
        {
            return Err(Error::Store(format!(
                "Spending for message {} already exists",
                new.message_id
            )));
        }

        state.next_spending_id += 1;
        let now = Utc::now();
        let spending = Spending {
            id: state.next_spending_id,
            chat_id: new.chat_id,
            message_id: new.message_id,
            cost: new.cost,
            description: new.description.clone(),
            spent_at: new.spent_at,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.spendings.insert(
            spending.id,
            StoredSpending {
                spending: spending.clone(),
                tag_ids: Vec::new(),
            },
        );
        Ok(spending)
    }

    fn find_spending_by_message_id(&self, message_id: i64) -> Result<Option<Spending>> {
        let state = self.lock();
        Ok(state
            .spendings
            .values()
            .find(|s| s.spending.message_id == message_id)
            .map(|s| state.hydrate(s)))
    }

    fn update_spending(&self, spending: &Spending) -> Result<()> {
        let mut state = self.lock();

        if state.fail_update_spending {
            return Err(Error::Store("Failed to update spending".into()));
        }

        let stored = state
            .spendings
            .get_mut(&spending.id)
            .ok_or_else(|| Error::NotFound(format!("spending {}", spending.id)))?;
        stored.spending.cost = spending.cost;
        stored.spending.description = spending.description.clone();
        stored.spending.spent_at = spending.spent_at;
        stored.spending.updated_at = Utc::now();
        Ok(())
    }

    fn sync_spending_tags(&self, spending_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut state = self.lock();

        if state.fail_sync_tags {
            return Err(Error::Store("Failed to sync spending tags".into()));
        }
        if let Some(missing) = tag_ids.iter().find(|id| !state.tags.contains_key(*id)) {
            return Err(Error::NotFound(format!("tag {}", missing)));
        }

        let mut unique = Vec::with_capacity(tag_ids.len());
        for id in tag_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let stored = state
            .spendings
            .get_mut(&spending_id)
            .ok_or_else(|| Error::NotFound(format!("spending {}", spending_id)))?;
        stored.tag_ids = unique;
        Ok(())
    }

    fn spendings_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Spending>> {
        let state = self.lock();
        let mut found: Vec<Spending> = state
            .spendings
            .values()
            .filter(|s| s.spending.spent_at >= from && s.spending.spent_at <= to)
            .map(|s| state.hydrate(s))
            .collect();
        found.sort_by_key(|s| (s.spent_at, s.id));
        Ok(found)
    }
}
