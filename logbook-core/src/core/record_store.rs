//! Read-only query contract consumed by the export engine.
//!
//! [`Journal`](super::journal::Journal) is the SQLite implementation. Every
//! query excludes soft-deleted entries, and the partition queries bucket
//! entries by their start time in the process-local timezone.

use chrono::{Local, NaiveDate, TimeZone};

use crate::{Attachment, DayRecord, Entry, LogbookError, Result};

/// The queries the export engine needs from a journal.
pub trait RecordStore {
    /// Distinct years that contain at least one live entry, ascending.
    fn distinct_years(&self) -> Result<Vec<i32>>;

    /// Distinct months (1-12) of `year` that contain live entries, ascending.
    fn distinct_months(&self, year: i32) -> Result<Vec<u32>>;

    /// Distinct days (1-31) of `year`/`month` that contain live entries, ascending.
    fn distinct_days(&self, year: i32, month: u32) -> Result<Vec<u32>>;

    /// Live entries whose start lies in `[start, end)`, ascending by start time.
    fn entries_in_range(&self, start: i64, end: i64) -> Result<Vec<Entry>>;

    /// Attachments of `entry_id`, ascending by insertion time.
    fn attachments_for(&self, entry_id: i64) -> Result<Vec<Attachment>>;

    /// Live entries filed under the local calendar day `date`.
    fn entries_on(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        let (start, end) = local_day_range(date)?;
        self.entries_in_range(start, end)
    }

    /// Live entries of `date`, each paired with its attachments.
    fn records_on(&self, date: NaiveDate) -> Result<Vec<DayRecord>> {
        self.entries_on(date)?
            .into_iter()
            .map(|entry| {
                let attachments = self.attachments_for(entry.id)?;
                Ok(DayRecord { entry, attachments })
            })
            .collect()
    }
}

/// Returns `[start, end)` in Unix seconds for the local calendar day `date`.
///
/// Days around a DST switch are 23 or 25 hours long. An ambiguous local
/// midnight resolves to its earliest instant; a skipped one resolves to the
/// first local time that exists after it.
pub fn local_day_range(date: NaiveDate) -> Result<(i64, i64)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| LogbookError::InvalidDate(format!("no day after {date}")))?;
    Ok((local_start_of_day(date)?, local_start_of_day(next)?))
}

fn local_start_of_day(date: NaiveDate) -> Result<i64> {
    let mut probe = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| LogbookError::InvalidDate(date.to_string()))?;

    // Gaps never exceed a few hours; 15 minute steps land on every real offset.
    for _ in 0..(24 * 4) {
        if let Some(dt) = Local.from_local_datetime(&probe).earliest() {
            return Ok(dt.timestamp());
        }
        probe += chrono::Duration::minutes(15);
    }

    Err(LogbookError::InvalidDate(format!(
        "{date} has no representable local start"
    )))
}
