//! High-level journal operations over a Logbook SQLite database.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::core::attachment::is_plain_file_name;
use crate::core::storage::MAX_BLOB_BYTES;
use crate::{Attachment, Entry, LogbookError, RecordStore, Result, Storage};

const ENTRY_COLUMNS: &str = "id, init, fin, inserted, note, deleted";
const ATTACHMENT_COLUMNS: &str = "id, entry_id, name, inserted, content";

/// Aggregate counters reported by the `info` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalStats {
    /// Entries that have not been soft-deleted.
    pub entries: u64,
    /// Entries marked as deleted.
    pub deleted_entries: u64,
    pub attachments: u64,
    /// Sum of all attachment sizes in bytes.
    pub blob_bytes: u64,
}

/// An open journal backed by a SQLite database.
///
/// `Journal` owns all writes (entries, attachments, soft deletes) and is the
/// SQLite implementation of [`RecordStore`] used by the export engine.
pub struct Journal {
    storage: Storage,
    path: Option<PathBuf>,
}

impl Journal {
    /// Opens the journal at `path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::InvalidJournal`] if the file is some other SQLite
    /// database, or [`LogbookError::Database`] for any SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(&path)?;
        Ok(Self {
            storage,
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Opens a throwaway journal that lives only in memory.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            storage: Storage::open_in_memory()?,
            path: None,
        })
    }

    /// The database file backing this journal, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records a new entry spanning `start..end` (Unix seconds).
    pub fn add_entry(&mut self, start: i64, end: i64, note: &str) -> Result<Entry> {
        let inserted = chrono::Utc::now().timestamp();
        self.storage.connection().execute(
            "INSERT INTO entries (init, fin, inserted, note, deleted) VALUES (?, ?, ?, ?, 0)",
            params![start, end, inserted, note],
        )?;
        let id = self.storage.connection().last_insert_rowid();
        info!("inserted entry #{id}");

        Ok(Entry {
            id,
            start,
            end,
            inserted,
            note: note.to_string(),
            deleted: false,
        })
    }

    /// Stores `content` as an attachment named `name` on entry `entry_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::EntryNotFound`] if the entry does not exist,
    /// [`LogbookError::InvalidAttachmentName`] if `name` is not a plain file
    /// name, or [`LogbookError::AttachmentTooLarge`] past the SQLite blob limit.
    pub fn add_attachment(&mut self, entry_id: i64, name: &str, content: &[u8]) -> Result<Attachment> {
        self.get_entry(entry_id)?;

        if !is_plain_file_name(name) {
            return Err(LogbookError::InvalidAttachmentName(name.to_string()));
        }
        let size = content.len() as u64;
        if size > MAX_BLOB_BYTES {
            return Err(LogbookError::AttachmentTooLarge {
                size,
                max: MAX_BLOB_BYTES,
            });
        }

        let inserted = chrono::Utc::now().timestamp();
        self.storage.connection().execute(
            "INSERT INTO attachments (name, inserted, content, entry_id) VALUES (?, ?, ?, ?)",
            params![name, inserted, content, entry_id],
        )?;
        let id = self.storage.connection().last_insert_rowid();
        info!("attached {name} ({size} bytes) to entry #{entry_id}");

        Ok(Attachment {
            id,
            entry_id,
            name: name.to_string(),
            inserted,
            content: content.to_vec(),
        })
    }

    /// Reads the file at `path` and stores it as an attachment under its own file name.
    pub fn attach_file<P: AsRef<Path>>(&mut self, entry_id: i64, path: P) -> Result<Attachment> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LogbookError::InvalidAttachmentName(path.display().to_string()))?
            .to_string();

        let size = std::fs::metadata(path)?.len();
        if size > MAX_BLOB_BYTES {
            return Err(LogbookError::AttachmentTooLarge {
                size,
                max: MAX_BLOB_BYTES,
            });
        }

        let content = std::fs::read(path)?;
        self.add_attachment(entry_id, &name, &content)
    }

    /// Fetches a single entry by ID, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::EntryNotFound`] if no entry has this ID.
    pub fn get_entry(&self, id: i64) -> Result<Entry> {
        self.storage
            .connection()
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
                [id],
                map_entry_row,
            )
            .optional()?
            .ok_or(LogbookError::EntryNotFound(id))
    }

    /// Soft-deletes entry `id`. Returns the number of rows marked.
    ///
    /// Deleted entries stay in the database but disappear from every query the
    /// export engine runs.
    pub fn delete_entry(&mut self, id: i64) -> Result<usize> {
        let affected = self
            .storage
            .connection()
            .execute("UPDATE entries SET deleted = 1 WHERE id = ?", [id])?;
        info!("{affected} row(s) deleted");
        Ok(affected)
    }

    /// Fetches a single attachment, including its content.
    pub fn get_attachment(&self, id: i64) -> Result<Attachment> {
        self.storage
            .connection()
            .query_row(
                &format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?"),
                [id],
                map_attachment_row,
            )
            .optional()?
            .ok_or(LogbookError::AttachmentNotFound(id))
    }

    /// Returns entry, attachment and blob-size totals.
    pub fn stats(&self) -> Result<JournalStats> {
        let conn = self.storage.connection();
        let (entries, deleted_entries): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(deleted = 0), 0), COALESCE(SUM(deleted != 0), 0) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (attachments, blob_bytes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(content)), 0) FROM attachments",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(JournalStats {
            entries: entries as u64,
            deleted_entries: deleted_entries as u64,
            attachments: attachments as u64,
            blob_bytes: blob_bytes as u64,
        })
    }

    fn query_partition<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<u32>> {
        let mut stmt = self.storage.connection().prepare(sql)?;
        let values = stmt
            .query_map(params, |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }
}

impl RecordStore for Journal {
    fn distinct_years(&self) -> Result<Vec<i32>> {
        let mut stmt = self.storage.connection().prepare(
            "SELECT DISTINCT CAST(strftime('%Y', init, 'unixepoch', 'localtime') AS INTEGER) AS y
             FROM entries
             WHERE deleted = 0
             ORDER BY y",
        )?;
        let years = stmt
            .query_map([], |row| row.get::<_, i32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("distinct years: {years:?}");
        Ok(years)
    }

    fn distinct_months(&self, year: i32) -> Result<Vec<u32>> {
        self.query_partition(
            "SELECT DISTINCT CAST(strftime('%m', init, 'unixepoch', 'localtime') AS INTEGER) AS m
             FROM entries
             WHERE deleted = 0
               AND CAST(strftime('%Y', init, 'unixepoch', 'localtime') AS INTEGER) = ?1
             ORDER BY m",
            params![year],
        )
    }

    fn distinct_days(&self, year: i32, month: u32) -> Result<Vec<u32>> {
        self.query_partition(
            "SELECT DISTINCT CAST(strftime('%d', init, 'unixepoch', 'localtime') AS INTEGER) AS d
             FROM entries
             WHERE deleted = 0
               AND CAST(strftime('%Y', init, 'unixepoch', 'localtime') AS INTEGER) = ?1
               AND CAST(strftime('%m', init, 'unixepoch', 'localtime') AS INTEGER) = ?2
             ORDER BY d",
            params![year, month],
        )
    }

    fn entries_in_range(&self, start: i64, end: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.storage.connection().prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE init >= ?1 AND init < ?2 AND deleted = 0
             ORDER BY init, id"
        ))?;
        let entries = stmt
            .query_map(params![start, end], map_entry_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn attachments_for(&self, entry_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = self.storage.connection().prepare(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments
             WHERE entry_id = ?1
             ORDER BY inserted, id"
        ))?;
        let attachments = stmt
            .query_map([entry_id], map_attachment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(attachments)
    }
}

fn map_entry_row(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        start: row.get(1)?,
        end: row.get(2)?,
        inserted: row.get(3)?,
        note: row.get(4)?,
        deleted: row.get::<_, i64>(5)? != 0,
    })
}

fn map_attachment_row(row: &Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        name: row.get(2)?,
        inserted: row.get(3)?,
        content: row.get(4)?,
    })
}
