//! Tag operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Tag;

pub(super) fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    let created_at_str: String = row.get(2)?;
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(2, &created_at_str)?,
    })
}

impl Database {
    /// Create a new tag
    pub fn insert_tag(&self, name: &str) -> Result<Tag> {
        if name.is_empty() {
            return Err(Error::InvalidData("Tag name must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute("INSERT INTO tags (name) VALUES (?)", params![name])?;
        let id = conn.last_insert_rowid();

        let tag = conn.query_row(
            "SELECT id, name, created_at FROM tags WHERE id = ?",
            params![id],
            tag_from_row,
        )?;
        Ok(tag)
    }

    /// Get a tag by exact name
    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;

        let tag = conn
            .query_row(
                "SELECT id, name, created_at FROM tags WHERE name = ?",
                params![name],
                tag_from_row,
            )
            .optional()?;

        Ok(tag)
    }

    /// List all tags ordered by name
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM tags ORDER BY name")?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}
