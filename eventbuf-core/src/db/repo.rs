//! SQLite-backed key-value store

use crate::error::{Error, Result};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Durable store holding the persisted event snapshot
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection()?;
        super::schema::run_migrations(&conn)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("database connection lock poisoned".to_string()))
    }

    /// Read a value
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a value
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// When a key was last written
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.connection()?;
        let ts: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn migrated() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_get_missing() {
        let db = migrated();
        assert_eq!(db.get_value("savedEvents").unwrap(), None);
        assert_eq!(db.updated_at("savedEvents").unwrap(), None);
    }

    #[test]
    fn test_set_and_overwrite() {
        let db = migrated();
        db.set_value("k", "v1").unwrap();
        db.set_value("k", "v2").unwrap();

        assert_eq!(db.get_value("k").unwrap().as_deref(), Some("v2"));
        assert!(db.updated_at("k").unwrap().is_some());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/store.db");

        {
            let db = Database::open(&path).unwrap();
            db.migrate().unwrap();
            db.set("savedEvents", "{\"events\":[]}").unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert_eq!(
            db.get("savedEvents").unwrap().as_deref(),
            Some("{\"events\":[]}")
        );
    }
}
