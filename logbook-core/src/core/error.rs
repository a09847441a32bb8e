//! Error types for the Logbook core library.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur within the Logbook core library.
#[derive(Debug, Error)]
pub enum LogbookError {
    /// A SQLite query or statement failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An export target directory already has content and overwrite was not requested.
    #[error("Directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// An export target path exists but is a plain file.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A directory cannot be created because its parent is missing.
    #[error("Parent directory missing: {}", .0.display())]
    MissingParent(PathBuf),

    /// An entry ID was requested that does not exist in the journal.
    #[error("Entry not found: {0}")]
    EntryNotFound(i64),

    /// An attachment ID was requested that does not exist in the journal.
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(i64),

    /// An attachment name is not a single plain file name.
    #[error("Invalid attachment name: {0:?}")]
    InvalidAttachmentName(String),

    /// A file is larger than the biggest blob SQLite will store.
    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: u64, max: u64 },

    /// An output permission string could not be parsed.
    #[error("Invalid permissions: {0}")]
    InvalidPermissions(String),

    /// A date or timestamp could not be mapped to the local calendar.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The opened file is not a valid Logbook journal.
    #[error("Invalid journal: {0}")]
    InvalidJournal(String),

    /// A forced export would remove the journal database itself.
    #[error("Refusing to clear {}: it contains the journal database", .0.display())]
    UnsafeExportTarget(PathBuf),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias that pins the error type to [`LogbookError`].
pub type Result<T> = std::result::Result<T, LogbookError>;

impl LogbookError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Journal query failed: {e}"),
            Self::DirectoryNotEmpty(path) => format!(
                "{} already has content; use --force to overwrite it",
                path.display()
            ),
            Self::NotADirectory(path) => format!("{} is a file, not a directory", path.display()),
            Self::MissingParent(path) => format!(
                "{} does not exist or is not a directory; create it first",
                path.display()
            ),
            Self::EntryNotFound(id) => format!("Entry #{id} not found"),
            Self::AttachmentNotFound(id) => format!("Attachment #{id} not found"),
            Self::InvalidAttachmentName(name) => format!("Cannot use {name:?} as a file name"),
            Self::AttachmentTooLarge { max, .. } => format!("File too big: max {max} bytes"),
            Self::InvalidPermissions(_) | Self::InvalidDate(_) => self.to_string(),
            Self::InvalidJournal(_) => "Could not open journal file".to_string(),
            Self::UnsafeExportTarget(path) => format!(
                "Refusing to clear {} because the journal lives there",
                path.display()
            ),
            Self::Io(e) => format!("File error: {e}"),
        }
    }
}
