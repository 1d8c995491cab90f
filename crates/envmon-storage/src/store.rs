//! Session store connection and operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// String key-value store shared by everything in one console tab.
/// Clones share the underlying connection, so a reload-style second
/// manager sees exactly what the first one persisted.
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Tab-scoped store: gone when the process ends.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM session_store WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM session_store WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = SessionStore::open_in_memory().unwrap();

        assert_eq!(store.get("sessionToken").unwrap(), None);

        store.set("sessionToken", "envadmin").unwrap();
        assert_eq!(
            store.get("sessionToken").unwrap().as_deref(),
            Some("envadmin")
        );

        // Overwrite keeps a single row per key
        store.set("sessionToken", "other").unwrap();
        assert_eq!(store.get("sessionToken").unwrap().as_deref(), Some("other"));

        store.remove("sessionToken").unwrap();
        assert_eq!(store.get("sessionToken").unwrap(), None);

        // Removing an absent key is not an error
        store.remove("sessionToken").unwrap();
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::open_in_memory().unwrap();
        let view = store.clone();

        store.set("sessionkey", "abc").unwrap();
        assert_eq!(view.get("sessionkey").unwrap().as_deref(), Some("abc"));
    }
}
