//! Spending operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::tags::tag_from_row;
use super::{format_datetime, parse_datetime, Database, DbConn};
use crate::error::{Error, Result};
use crate::models::{NewSpending, Spending, Tag};

const SPENDING_COLUMNS: &str =
    "id, chat_id, message_id, cost, description, spent_at, created_at, updated_at";

fn spending_from_row(row: &Row<'_>) -> rusqlite::Result<Spending> {
    let spent_at: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Spending {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        message_id: row.get(2)?,
        cost: row.get(3)?,
        description: row.get(4)?,
        spent_at: parse_datetime(5, &spent_at)?,
        tags: Vec::new(),
        created_at: parse_datetime(6, &created_at)?,
        updated_at: parse_datetime(7, &updated_at)?,
    })
}

/// Tags of one spending, in association order
fn tags_for_spending(conn: &DbConn, spending_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.id, t.name, t.created_at
        FROM spending_tags st
        JOIN tags t ON t.id = st.tag_id
        WHERE st.spending_id = ?
        ORDER BY st.rowid
        "#,
    )?;
    let tags = stmt
        .query_map(params![spending_id], tag_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

impl Database {
    /// Insert a spending (fails if the message id is already recorded)
    pub fn insert_spending(&self, spending: &NewSpending) -> Result<Spending> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO spendings (chat_id, message_id, cost, description, spent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                spending.chat_id,
                spending.message_id,
                spending.cost,
                spending.description,
                format_datetime(&spending.spent_at),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let created = conn.query_row(
            &format!("SELECT {} FROM spendings WHERE id = ?", SPENDING_COLUMNS),
            params![id],
            spending_from_row,
        )?;
        Ok(created)
    }

    /// Get a spending by source message id, with its tags
    pub fn get_spending_by_message_id(&self, message_id: i64) -> Result<Option<Spending>> {
        let conn = self.conn()?;

        let spending = conn
            .query_row(
                &format!(
                    "SELECT {} FROM spendings WHERE message_id = ?",
                    SPENDING_COLUMNS
                ),
                params![message_id],
                spending_from_row,
            )
            .optional()?;

        match spending {
            Some(mut spending) => {
                spending.tags = tags_for_spending(&conn, spending.id)?;
                Ok(Some(spending))
            }
            None => Ok(None),
        }
    }

    /// Persist the mutable fields (cost, description, spent_at) of a spending
    pub fn save_spending(&self, spending: &Spending) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE spendings
            SET cost = ?, description = ?, spent_at = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                spending.cost,
                spending.description,
                format_datetime(&spending.spent_at),
                spending.id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("spending {}", spending.id)));
        }
        Ok(())
    }

    /// Replace all tag associations of a spending in one transaction
    pub fn replace_spending_tags(&self, spending_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM spendings WHERE id = ?",
                params![spending_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(Error::NotFound(format!("spending {}", spending_id)));
        }

        tx.execute(
            "DELETE FROM spending_tags WHERE spending_id = ?",
            params![spending_id],
        )?;
        for tag_id in tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO spending_tags (spending_id, tag_id) VALUES (?, ?)",
                params![spending_id, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Spendings with `from <= spent_at <= to`, oldest first, tags populated
    pub fn list_spendings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Spending>> {
        let conn = self.conn()?;
        let from = format_datetime(&from);
        let to = format_datetime(&to);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM spendings WHERE spent_at BETWEEN ?1 AND ?2 ORDER BY spent_at, id",
            SPENDING_COLUMNS
        ))?;
        let mut spendings = stmt
            .query_map(params![from, to], spending_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Load all associations for the window in one pass
        let mut tag_stmt = conn.prepare(
            r#"
            SELECT st.spending_id, t.id, t.name, t.created_at
            FROM spending_tags st
            JOIN tags t ON t.id = st.tag_id
            JOIN spendings s ON s.id = st.spending_id
            WHERE s.spent_at BETWEEN ?1 AND ?2
            ORDER BY st.rowid
            "#,
        )?;
        let mut tags_by_spending: HashMap<i64, Vec<Tag>> = HashMap::new();
        let rows = tag_stmt.query_map(params![from, to], |row| {
            let spending_id: i64 = row.get(0)?;
            let created_at: String = row.get(3)?;
            Ok((
                spending_id,
                Tag {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(3, &created_at)?,
                },
            ))
        })?;
        for row in rows {
            let (spending_id, tag) = row?;
            tags_by_spending.entry(spending_id).or_default().push(tag);
        }

        for spending in &mut spendings {
            spending.tags = tags_by_spending.remove(&spending.id).unwrap_or_default();
        }

        Ok(spendings)
    }
}
