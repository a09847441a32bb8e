//! Static-site export of a journal as a `YYYY/MM/DD` directory tree.
//!
//! The walk is depth-first and stops at the first error. Directories written
//! before the failure stay on disk; nothing is rolled back. Every directory's
//! `index.html` is written only after all of its children were exported, so
//! an index never links to a subtree that failed half-way.
//!
//! ```text
//! root/index.html                 years
//! root/2024/index.html            months of 2024
//! root/2024/03/index.html         days of March 2024
//! root/2024/03/05/index.html      entries of the day
//! root/2024/03/05/photo.jpg       rehydrated attachment
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::fs::{ensure_empty_dir, remove_tree, write_file};
use crate::core::render::{render_day_detail, render_index_page, PageLink};
use crate::{ExportOptions, LogbookError, RecordStore, Result};

/// Name of the page written into every exported directory.
pub const INDEX_FILE: &str = "index.html";

/// Title of the root page and label of the root breadcrumb link.
pub const ROOT_TITLE: &str = "Logbook";

const YEAR_DEPTH: usize = 1;
const MONTH_DEPTH: usize = 2;
const DAY_DEPTH: usize = 3;

/// Counters describing a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub years: usize,
    pub months: usize,
    pub days: usize,
    pub entries: usize,
    pub attachments: usize,
}

/// Counters for a single exported day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub entries: usize,
    pub attachments: usize,
}

/// Exports every live entry of `store` below `options.root`.
///
/// Without `options.force` the root must be absent or empty. With it, the
/// root's previous content is deleted first.
///
/// # Errors
///
/// Returns [`LogbookError::DirectoryNotEmpty`] or [`LogbookError::NotADirectory`]
/// when a target directory is occupied, [`LogbookError::Database`] when a query
/// fails, and [`LogbookError::Io`] for any filesystem failure. The first error
/// ends the export.
pub fn export_journal<S: RecordStore + ?Sized>(
    store: &S,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let root = options.root.as_path();
    info!("exporting journal to {}", root.display());

    if options.force {
        warn!("force: clearing {}", root.display());
        remove_tree(root, true)?;
    }
    ensure_empty_dir(root, options.permissions)?;

    let mut summary = ExportSummary::default();
    let mut children = Vec::new();

    for year in store.distinct_years()? {
        let key = format!("{year:04}");
        let dir = child_dir(root, &key);
        if options.force {
            remove_tree(&dir, false)?;
        }
        ensure_empty_dir(&dir, options.permissions)?;

        export_year(store, options, year, &key, &dir, &mut summary)?;
        summary.years += 1;
        children.push(child_link(&key));
    }

    write_index(root, ROOT_TITLE, &[], &children, options.permissions)?;

    info!(
        "export finished: {} years, {} months, {} days, {} entries, {} attachments",
        summary.years, summary.months, summary.days, summary.entries, summary.attachments
    );
    Ok(summary)
}

fn export_year<S: RecordStore + ?Sized>(
    store: &S,
    options: &ExportOptions,
    year: i32,
    year_key: &str,
    dir: &Path,
    summary: &mut ExportSummary,
) -> Result<()> {
    let mut children = Vec::new();

    for month in store.distinct_months(year)? {
        let key = format!("{month:02}");
        let month_dir = child_dir(dir, &key);
        ensure_empty_dir(&month_dir, options.permissions)?;

        export_month(store, options, year, month, &[year_key, key.as_str()], &month_dir, summary)?;
        summary.months += 1;
        children.push(child_link(&key));
    }

    let crumbs = breadcrumb(YEAR_DEPTH, &[]);
    write_index(dir, year_key, &crumbs, &children, options.permissions)
}

fn export_month<S: RecordStore + ?Sized>(
    store: &S,
    options: &ExportOptions,
    year: i32,
    month: u32,
    trail: &[&str],
    dir: &Path,
    summary: &mut ExportSummary,
) -> Result<()> {
    let mut children = Vec::new();

    for day in store.distinct_days(year, month)? {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            LogbookError::InvalidDate(format!("{year:04}-{month:02}-{day:02}"))
        })?;
        let key = format!("{day:02}");
        let day_dir = child_dir(dir, &key);
        ensure_empty_dir(&day_dir, options.permissions)?;

        let crumbs = breadcrumb(DAY_DEPTH, trail);
        let day_summary = write_day(store, date, &crumbs, &day_dir, options.permissions)?;
        summary.days += 1;
        summary.entries += day_summary.entries;
        summary.attachments += day_summary.attachments;
        children.push(child_link(&key));
    }

    let crumbs = breadcrumb(MONTH_DEPTH, &trail[..1]);
    write_index(dir, &trail.join("-"), &crumbs, &children, options.permissions)
}

/// Exports one local calendar day into `dir`: its detail page plus attachments.
///
/// `dir` is created when missing. Existing files with the same names are
/// overwritten; nothing else in `dir` is touched.
///
/// # Errors
///
/// Returns [`LogbookError::NotADirectory`] if `dir` is a file.
pub fn export_day<S: RecordStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    dir: &Path,
    permissions: u32,
) -> Result<DaySummary> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(LogbookError::NotADirectory(dir.to_path_buf()));
        }
    } else {
        ensure_empty_dir(dir, permissions)?;
    }
    write_day(store, date, &[], dir, permissions)
}

fn write_day<S: RecordStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    crumbs: &[PageLink],
    dir: &Path,
    permissions: u32,
) -> Result<DaySummary> {
    let records = store.records_on(date)?;
    let title = date.format("%Y-%m-%d").to_string();
    let page = render_day_detail(&title, crumbs, &records, dir, permissions)?;
    write_file(&dir.join(INDEX_FILE), &page, permissions)?;
    info!("wrote {}", dir.join(INDEX_FILE).display());

    Ok(DaySummary {
        entries: records.len(),
        attachments: records.iter().map(|r| r.attachments.len()).sum(),
    })
}

/// Refuses a forced export whose root contains the journal database.
///
/// # Errors
///
/// Returns [`LogbookError::UnsafeExportTarget`] if `journal` lies inside `root`.
pub fn check_export_target(root: &Path, journal: &Path) -> Result<()> {
    let Ok(root) = root.canonicalize() else {
        // A root that does not exist yet cannot contain anything.
        return Ok(());
    };
    let journal = journal.canonicalize()?;
    if journal.starts_with(&root) {
        return Err(LogbookError::UnsafeExportTarget(root));
    }
    Ok(())
}

fn child_dir(parent: &Path, key: &str) -> PathBuf {
    parent.join(key)
}

fn child_link(key: &str) -> PageLink {
    PageLink {
        key: key.to_string(),
        href: format!("{key}/{INDEX_FILE}"),
        label: key.to_string(),
    }
}

/// Relative link to the index `levels` directories up.
fn up_link(levels: usize) -> String {
    format!("{}{INDEX_FILE}", "../".repeat(levels))
}

/// Links from a page at `depth` back to the root and to each ancestor in `trail`.
///
/// `trail` holds the keys of the ancestors below the root, outermost first.
fn breadcrumb(depth: usize, trail: &[&str]) -> Vec<PageLink> {
    debug_assert!(trail.len() < depth);
    let mut links = vec![PageLink {
        key: String::new(),
        href: up_link(depth),
        label: ROOT_TITLE.to_string(),
    }];
    for (level, key) in trail.iter().enumerate() {
        links.push(PageLink {
            key: (*key).to_string(),
            href: up_link(depth - level - 1),
            label: (*key).to_string(),
        });
    }
    links
}

fn write_index(
    dir: &Path,
    title: &str,
    crumbs: &[PageLink],
    children: &[PageLink],
    permissions: u32,
) -> Result<()> {
    let page = render_index_page(title, crumbs, children);
    let path = dir.join(INDEX_FILE);
    write_file(&path, &page, permissions)?;
    info!("wrote {}", path.display());
    Ok(())
}
