//! Settings repository implementation
//!
//! A small key-value table for preferences that are not worth their own table.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for settings storage operations
pub trait SettingsRepository {
    /// Read a setting, `None` when unset
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a setting
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting; removing an unset key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every setting whose key starts with `prefix`
    fn remove_prefix(&self, prefix: &str) -> Result<usize>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", params![key])?;
        Ok(())
    }

    fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM settings WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        Ok(rows)
    }
}
