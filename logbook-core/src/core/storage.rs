//! SQLite connection bootstrap for a journal file.

use crate::{LogbookError, Result};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;

/// Largest blob the bundled SQLite accepts (`SQLITE_MAX_LENGTH` default).
pub const MAX_BLOB_BYTES: u64 = 1_000_000_000;

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens the journal at `path`, creating the file and schema when it does not exist yet.
    ///
    /// A freshly created file whose schema cannot be applied is removed again so a
    /// half-initialised journal is never left behind.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::InvalidJournal`] if an existing file lacks the journal
    /// tables, or [`LogbookError::Database`] for any SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("journal does not exist, creating {}", path.display());
            return Self::create(path);
        }

        let conn = Connection::open(path)?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('entries', 'attachments')",
            [],
            |row| row.get(0),
        )?;

        if table_count != 2 {
            return Err(LogbookError::InvalidJournal(format!(
                "{} is not a Logbook database",
                path.display()
            )));
        }

        Ok(Self { conn })
    }

    /// Creates a new journal file at `path` and applies the schema.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        if let Err(e) = conn.execute_batch(include_str!("schema.sql")) {
            drop(conn);
            if std::fs::remove_file(path).is_err() {
                error!(
                    "created journal {} is corrupted and could not be deleted: delete it and do not use it",
                    path.display()
                );
            }
            return Err(e.into());
        }
        Ok(Self { conn })
    }

    /// Opens a private in-memory journal with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
