use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of one journal entry.
///
/// Timestamps are Unix seconds. `start` decides which calendar day the entry is
/// filed under when the journal is exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub start: i64,
    pub end: i64,
    pub inserted: i64,
    pub note: String,
    pub deleted: bool,
}

impl Entry {
    /// Start time in the local timezone, or `None` if the timestamp is out of range.
    pub fn start_local(&self) -> Option<DateTime<Local>> {
        to_local(self.start)
    }

    /// End time in the local timezone, or `None` if the timestamp is out of range.
    pub fn end_local(&self) -> Option<DateTime<Local>> {
        to_local(self.end)
    }

    /// The local calendar day this entry belongs to.
    pub fn local_date(&self) -> Option<NaiveDate> {
        self.start_local().map(|dt| dt.date_naive())
    }
}

pub(crate) fn to_local(timestamp: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&Local))
}
