//! Internal domain modules for the Logbook core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod attachment;
pub mod entry;
pub mod error;
pub mod export;
pub mod fs;
pub mod journal;
pub mod options;
pub mod record_store;
pub mod render;
pub mod storage;

#[doc(inline)]
pub use attachment::Attachment;
#[doc(inline)]
pub use entry::Entry;
#[doc(inline)]
pub use error::{LogbookError, Result};
#[doc(inline)]
pub use export::{check_export_target, export_day, export_journal, DaySummary, ExportSummary};
#[doc(inline)]
pub use journal::{Journal, JournalStats};
#[doc(inline)]
pub use options::{parse_permissions, ExportOptions, DEFAULT_PERMISSIONS};
#[doc(inline)]
pub use record_store::{local_day_range, RecordStore};
#[doc(inline)]
pub use render::{format_size, render_resume, DayRecord};
#[doc(inline)]
pub use storage::Storage;
