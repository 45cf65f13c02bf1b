//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::params;

    fn new_spending(message_id: i64, cost: f64, spent_at: DateTime<Utc>) -> NewSpending {
        NewSpending {
            chat_id: 42,
            message_id,
            cost,
            description: format!("Lunch {} #food", cost),
            spent_at,
        }
    }

    fn may(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_tags().unwrap().is_empty());
        assert_eq!(db.stats().unwrap(), StoreStats::default());
        assert!(!db.is_encrypted());
    }

    #[test]
    fn test_schema_exists() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('spendings') WHERE name IN ('id', 'chat_id', 'message_id', 'cost', 'description', 'spent_at', 'created_at', 'updated_at')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 8, "spendings table should have 8 expected columns");

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('spending_tags') WHERE name IN ('spending_id', 'tag_id')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 2);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.insert_tag("food").unwrap();
        db.migrate().unwrap();
        assert_eq!(db.list_tags().unwrap().len(), 1);
    }

    #[test]
    fn test_tag_crud() {
        let db = Database::in_memory().unwrap();

        let food = db.insert_tag("food").unwrap();
        assert!(food.id > 0);
        assert_eq!(food.name, "food");

        assert_eq!(db.get_tag_by_name("food").unwrap(), Some(food));
        assert!(db.get_tag_by_name("Food").unwrap().is_none());

        // Names are unique and case-sensitive
        assert!(db.insert_tag("food").is_err());
        db.insert_tag("Food").unwrap();

        let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Food", "food"]);
    }

    #[test]
    fn test_empty_tag_name_rejected() {
        let db = Database::in_memory().unwrap();
        assert!(db.insert_tag("").is_err());

        // The CHECK constraint backs up the early return
        let conn = db.conn().unwrap();
        assert!(conn
            .execute("INSERT INTO tags (name) VALUES ('')", [])
            .is_err());
    }

    #[test]
    fn test_spending_crud() {
        let db = Database::in_memory().unwrap();

        let created = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        assert_eq!(created.message_id, 7);
        assert_eq!(created.chat_id, 42);
        assert_eq!(created.cost, 15.5);
        assert_eq!(created.spent_at, may(9, 0));
        assert!(created.tags.is_empty());

        let found = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.description, "Lunch 15.5 #food");

        assert!(db.get_spending_by_message_id(8).unwrap().is_none());
    }

    #[test]
    fn test_spending_message_id_unique() {
        let db = Database::in_memory().unwrap();
        db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        assert!(db.insert_spending(&new_spending(7, 20.0, may(10, 0))).is_err());
        assert_eq!(db.stats().unwrap().spendings, 1);
    }

    #[test]
    fn test_save_spending_keeps_identity() {
        let db = Database::in_memory().unwrap();
        let mut spending = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();

        spending.cost = 20.0;
        spending.description = "Lunch 20 #work".to_string();
        spending.spent_at = may(10, 0);
        spending.chat_id = 999;
        db.save_spending(&spending).unwrap();

        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(reloaded.id, spending.id);
        assert_eq!(reloaded.cost, 20.0);
        assert_eq!(reloaded.description, "Lunch 20 #work");
        assert_eq!(reloaded.spent_at, may(10, 0));
        // chat_id is not part of the update
        assert_eq!(reloaded.chat_id, 42);
    }

    #[test]
    fn test_save_missing_spending() {
        let db = Database::in_memory().unwrap();
        let mut spending = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        spending.id += 100;

        assert!(matches!(
            db.save_spending(&spending),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_spending_tags() {
        let db = Database::in_memory().unwrap();
        let spending = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        let food = db.insert_tag("food").unwrap();
        let work = db.insert_tag("work").unwrap();
        let travel = db.insert_tag("travel").unwrap();

        db.replace_spending_tags(spending.id, &[work.id, food.id])
            .unwrap();
        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(reloaded.tag_names(), vec!["work", "food"]);

        // Full replace, not merge
        db.replace_spending_tags(spending.id, &[travel.id]).unwrap();
        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(reloaded.tag_names(), vec!["travel"]);

        // Duplicate ids collapse
        db.replace_spending_tags(spending.id, &[food.id, food.id])
            .unwrap();
        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(reloaded.tag_names(), vec!["food"]);

        db.replace_spending_tags(spending.id, &[]).unwrap();
        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert!(reloaded.tags.is_empty());
    }

    #[test]
    fn test_replace_tags_rolls_back_on_unknown_tag() {
        let db = Database::in_memory().unwrap();
        let spending = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        let food = db.insert_tag("food").unwrap();
        db.replace_spending_tags(spending.id, &[food.id]).unwrap();

        // Foreign key violation on the second insert aborts the whole sync
        assert!(db
            .replace_spending_tags(spending.id, &[food.id, 9999])
            .is_err());

        let reloaded = db.get_spending_by_message_id(7).unwrap().unwrap();
        assert_eq!(reloaded.tag_names(), vec!["food"]);
    }

    #[test]
    fn test_replace_tags_missing_spending() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.replace_spending_tags(12345, &[]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_spendings_between_inclusive() {
        let db = Database::in_memory().unwrap();
        let food = db.insert_tag("food").unwrap();
        let work = db.insert_tag("work").unwrap();

        let first = db.insert_spending(&new_spending(1, 1.0, may(1, 0))).unwrap();
        let second = db.insert_spending(&new_spending(2, 2.0, may(15, 12))).unwrap();
        db.insert_spending(&new_spending(3, 3.0, may(31, 23))).unwrap();
        db.replace_spending_tags(first.id, &[food.id]).unwrap();
        db.replace_spending_tags(second.id, &[food.id, work.id])
            .unwrap();

        let found = db.list_spendings_between(may(1, 0), may(15, 12)).unwrap();
        assert_eq!(
            found.iter().map(|s| s.message_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(found[0].tag_names(), vec!["food"]);
        assert_eq!(found[1].tag_names(), vec!["food", "work"]);

        let everything = db
            .list_spendings_between(may(1, 0), Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap())
            .unwrap();
        assert_eq!(everything.len(), 3);
        assert!(everything[2].tags.is_empty());

        let none = db
            .list_spendings_between(
                Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_spending_tags_cascade_delete() {
        let db = Database::in_memory().unwrap();
        let spending = db.insert_spending(&new_spending(7, 15.5, may(9, 0))).unwrap();
        let food = db.insert_tag("food").unwrap();
        db.replace_spending_tags(spending.id, &[food.id]).unwrap();

        let conn = db.conn().unwrap();
        conn.execute("DELETE FROM spendings WHERE id = ?", params![spending.id])
            .unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM spending_tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        // Tags outlive their spendings
        assert!(db.get_tag_by_name("food").unwrap().is_some());
    }

    #[test]
    fn test_record_store_impl() {
        let db = Database::in_memory().unwrap();
        let store: &dyn RecordStore = &db;

        assert!(store.find_tag_by_name("food").unwrap().is_none());
        let tag = store.create_tag("food").unwrap();
        let spending = store
            .create_spending(&new_spending(1, 9.99, may(3, 8)))
            .unwrap();
        store.sync_spending_tags(spending.id, &[tag.id]).unwrap();

        let found = store.find_spending_by_message_id(1).unwrap().unwrap();
        assert_eq!(found.tag_names(), vec!["food"]);
        assert_eq!(store.spendings_between(may(1, 0), may(4, 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let db = Database::in_memory().unwrap();
        db.insert_tag("food").unwrap();
        db.insert_tag("work").unwrap();
        db.insert_spending(&new_spending(1, 1.0, may(1, 0))).unwrap();

        assert_eq!(
            db.stats().unwrap(),
            StoreStats {
                tags: 2,
                spendings: 1
            }
        );
    }

    #[test]
    fn test_datetime_format_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let stored = format_datetime(&dt);
        assert_eq!(stored, "2024-12-31 23:59:59");
        assert_eq!(parse_datetime(0, &stored).unwrap(), dt);
        assert!(parse_datetime(0, "not a date").is_err());
    }

    #[test]
    fn test_encrypted_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encrypted.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new_with_key(path, Some("test-passphrase")).unwrap();
            assert!(db.is_encrypted());
            db.migrate().unwrap();
            db.insert_tag("food").unwrap();
        }

        // Same key reads the data back
        {
            let db = Database::new_with_key(path, Some("test-passphrase")).unwrap();
            assert_eq!(db.list_tags().unwrap().len(), 1);
        }

        // Wrong key or no key cannot read it
        let wrong = Database::new_with_key(path, Some("wrong-passphrase")).and_then(|db| db.stats());
        assert!(wrong.is_err(), "Should fail to read encrypted db with wrong key");

        let plain = Database::new_unencrypted(path).and_then(|db| db.stats());
        assert!(plain.is_err(), "Should fail to read encrypted db without key");
    }

    #[test]
    fn test_key_derivation_is_deterministic() {
        let key1 = derive_key("my-secret").unwrap();
        let key2 = derive_key("my-secret").unwrap();
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 64);

        let key3 = derive_key("other-secret").unwrap();
        assert_ne!(key1, key3);
    }
}
