//! Core library for Logbook, a personal log of dated notes with attachments.
//!
//! The primary entry points are [`Journal`], which represents an open journal
//! database, and [`export_journal`], which renders a journal as a static site
//! of `YYYY/MM/DD` directories with cross-linked index pages.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use crate::core::{
    attachment::Attachment,
    entry::Entry,
    error::{LogbookError, Result},
    export::{
        check_export_target, export_day, export_journal, DaySummary, ExportSummary, INDEX_FILE,
    },
    journal::{Journal, JournalStats},
    options::{parse_permissions, ExportOptions, DEFAULT_PERMISSIONS},
    record_store::{local_day_range, RecordStore},
    render::{format_size, render_resume, DayRecord},
    storage::Storage,
};
