//! Database repository layer
//!
//! Stores collection snapshots as rows of the `slots` table.

use crate::backend::SlotStore;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Summary of one stored slot.
#[derive(Debug, Clone)]
pub struct SlotInfo {
    /// Slot key (e.g. "cases")
    pub key: String,
    /// Size of the stored snapshot in bytes
    pub size_bytes: i64,
    /// Last write time
    pub updated_at: Option<DateTime<Utc>>,
}

/// Database handle (single connection)
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
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// List stored slots, ordered by key
    pub fn list_slots(&self) -> Result<Vec<SlotInfo>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT key, length(value), updated_at FROM slots ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            let updated_at: Option<String> = row.get(2)?;
            Ok(SlotInfo {
                key: row.get(0)?,
                size_bytes: row.get(1)?,
                updated_at: updated_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }
}

impl SlotStore for Database {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.connection();
        conn.query_row("SELECT value FROM slots WHERE key = ?", [key], |row| {
            row.get::<_, Vec<u8>>(0)
        })
        .optional()
        .map_err(Error::from)
    }

    fn read_batch(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut conn = self.connection();
        // Every SELECT below sees the same WAL snapshot until commit
        let tx = conn.transaction()?;
        let values = {
            let mut stmt = tx.prepare_cached("SELECT value FROM slots WHERE key = ?")?;
            keys.iter()
                .map(|key| {
                    stmt.query_row([key], |row| row.get::<_, Vec<u8>>(0))
                        .optional()
                })
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(values)
    }

    fn write_batch(&self, writes: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO slots (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for (key, value) in writes {
                stmt.execute(params![key, value, now])?;
            }
        }
        tx.commit()?;

        tracing::trace!(slots = writes.len(), "Wrote snapshot batch");
        Ok(())
    }
}
