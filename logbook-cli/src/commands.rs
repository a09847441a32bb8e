//! One function per subcommand.
//!
//! Commands print their results to `out` and log progress through `log`.
//! Every failure propagates to `main`, which turns it into a non-zero exit.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use log::{error, info, warn};

use logbook_core::core::fs::write_file;
use logbook_core::{
    check_export_target, export_day, export_journal, format_size, parse_permissions,
    render_resume, ExportOptions, Journal, LogbookError, RecordStore,
    DEFAULT_PERMISSIONS,
};

use crate::cli::{
    AddArgs, AttachArgs, Cli, Commands, ConfigArgs, DateArgs, DumpArgs, DumpDayArgs, FetchArgs,
    IdArgs,
};
use crate::settings::{self, AppSettings};

/// Journal location and output mode after merging flags with settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub journal_path: PathBuf,
    pub permissions: u32,
}

impl Context {
    pub fn resolve(cli: &Cli, settings: &AppSettings) -> Result<Self> {
        let journal_path = cli.path.clone().unwrap_or_else(|| settings.journal_path());
        let permissions = match cli.operm.as_deref().or(settings.output_permissions.as_deref()) {
            Some(value) => parse_permissions(value)?,
            None => DEFAULT_PERMISSIONS,
        };
        Ok(Self {
            journal_path,
            permissions,
        })
    }

    fn open_journal(&self) -> Result<Journal> {
        Journal::open(&self.journal_path)
            .with_context(|| format!("cannot open journal {}", self.journal_path.display()))
    }
}

pub fn run(cli: Cli, settings: AppSettings) -> Result<()> {
    let ctx = Context::resolve(&cli, &settings)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Add(args) => add(&ctx, args, &mut out),
        Commands::Attach(args) => attach(&ctx, args, &mut out),
        Commands::Resume(args) => resume(&ctx, args, &mut out),
        Commands::Delete(args) => delete(&ctx, args),
        Commands::Fetch(args) => fetch(&ctx, args, &mut out),
        Commands::DumpDay(args) => dump_day(&ctx, args, &mut out),
        Commands::Dump(args) => dump(&ctx, args, &mut out),
        Commands::Info => show_info(&ctx, &mut out),
        Commands::Config(args) => config(&settings::settings_file_path(), settings, args, &mut out),
    }
}

fn local_timestamp(dt: NaiveDateTime) -> Result<i64> {
    Local
        .from_local_datetime(&dt)
        .earliest()
        .map(|t| t.timestamp())
        .ok_or_else(|| anyhow!("{dt} does not exist in the local timezone"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn add(ctx: &Context, args: AddArgs, out: &mut impl Write) -> Result<()> {
    let start = match args.start {
        Some(dt) => local_timestamp(dt)?,
        None => Local::now().timestamp(),
    };
    let end = match args.end {
        Some(dt) => local_timestamp(dt)?,
        None => start,
    };
    if end < start {
        bail!("entry ends before it starts");
    }

    let mut journal = ctx.open_journal()?;
    let entry = journal.add_entry(start, end, &args.note)?;
    writeln!(out, "Inserted, with id #{}", entry.id)?;

    attach_all(&mut journal, entry.id, &args.attachments, out)
}

pub fn attach(ctx: &Context, args: AttachArgs, out: &mut impl Write) -> Result<()> {
    let mut journal = ctx.open_journal()?;
    journal.get_entry(args.id)?;
    attach_all(&mut journal, args.id, &args.files, out)
}

/// Attaches every file it can. Failures are logged and reported together at the end.
fn attach_all(journal: &mut Journal, entry_id: i64, files: &[PathBuf], out: &mut impl Write) -> Result<()> {
    let mut failed = 0;
    for file in files {
        match journal.attach_file(entry_id, file) {
            Ok(attachment) => writeln!(
                out,
                "Attached {} ({}) as #{}",
                attachment.name,
                format_size(attachment.size() as u64),
                attachment.id
            )?,
            Err(e) => {
                error!("could not attach {}: {}", file.display(), e.user_message());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} attachment(s) could not be stored", files.len());
    }
    Ok(())
}

pub fn resume(ctx: &Context, args: DateArgs, out: &mut impl Write) -> Result<()> {
    let date = args.date.unwrap_or_else(today);
    let journal = ctx.open_journal()?;
    let records = journal.records_on(date)?;
    if records.is_empty() {
        info!("no entries on {date}");
    }
    out.write_all(render_resume(&records).as_bytes())?;
    Ok(())
}

pub fn delete(ctx: &Context, args: IdArgs) -> Result<()> {
    let mut journal = ctx.open_journal()?;
    if journal.delete_entry(args.id)? == 0 {
        return Err(LogbookError::EntryNotFound(args.id).into());
    }
    Ok(())
}

pub fn fetch(ctx: &Context, args: FetchArgs, out: &mut impl Write) -> Result<()> {
    let journal = ctx.open_journal()?;
    let attachment = journal.get_attachment(args.id)?;

    if args.output == Path::new("-") {
        out.write_all(&attachment.content)?;
        out.flush()?;
    } else {
        write_file(&args.output, &attachment.content, ctx.permissions)?;
        info!(
            "wrote {} ({}) to {}",
            attachment.name,
            format_size(attachment.size() as u64),
            args.output.display()
        );
    }
    Ok(())
}

pub fn dump_day(ctx: &Context, args: DumpDayArgs, out: &mut impl Write) -> Result<()> {
    let date = args.date.unwrap_or_else(today);
    let journal = ctx.open_journal()?;
    let summary = export_day(&journal, date, &args.output_dir, ctx.permissions)?;
    writeln!(
        out,
        "{date}: {} entries, {} attachments written to {}",
        summary.entries,
        summary.attachments,
        args.output_dir.display()
    )?;
    Ok(())
}

pub fn dump(ctx: &Context, args: DumpArgs, out: &mut impl Write) -> Result<()> {
    let journal = ctx.open_journal()?;
    if args.force {
        warn!("using --force on {}", args.root.display());
        check_export_target(&args.root, &ctx.journal_path)?;
    }

    let options = ExportOptions::new(&args.root)
        .with_force(args.force)
        .with_permissions(ctx.permissions);
    let summary = export_journal(&journal, &options)?;

    writeln!(
        out,
        "Exported {} days ({} entries, {} attachments) to {}",
        summary.days,
        summary.entries,
        summary.attachments,
        args.root.display()
    )?;
    Ok(())
}

pub fn show_info(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let journal = ctx.open_journal()?;
    let stats = journal.stats()?;
    let average = if stats.entries == 0 {
        0.0
    } else {
        stats.attachments as f64 / stats.entries as f64
    };
    let db_size = fs::metadata(&ctx.journal_path)
        .with_context(|| format!("cannot stat {}", ctx.journal_path.display()))?
        .len();

    writeln!(out, "Total entries:     {}", stats.entries)?;
    writeln!(out, "Deleted entries:   {}", stats.deleted_entries)?;
    writeln!(out, "Total attachments: {} (avg. {average:.2} p.e.)", stats.attachments)?;
    writeln!(out, "Blob total size:   {}", format_size(stats.blob_bytes))?;
    writeln!(out, "DB size:           {}", format_size(db_size))?;
    Ok(())
}

/// Prints the settings, or updates and saves them when any option is given.
pub fn config(
    path: &Path,
    mut settings: AppSettings,
    args: ConfigArgs,
    out: &mut impl Write,
) -> Result<()> {
    if args.journal.is_none() && args.permissions.is_none() {
        writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
        return Ok(());
    }

    if let Some(value) = args.permissions {
        parse_permissions(&value)?;
        settings.output_permissions = Some(value);
    }
    if let Some(journal) = args.journal {
        settings.default_journal = Some(journal);
    }
    settings::save_to(path, &settings)?;
    writeln!(out, "Saved {}", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        Context {
            journal_path: dir.path().join("diary.db"),
            permissions: 0o644,
        }
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn add_note(ctx: &Context, note: &str, start: &str, files: Vec<PathBuf>) {
        let args = AddArgs {
            note: note.to_string(),
            start: Some(crate::cli::parse_datetime(start).unwrap()),
            end: None,
            attachments: files,
        };
        add(ctx, args, &mut Vec::new()).unwrap();
    }

    #[test]
    fn test_resolve_prefers_flags_over_settings() {
        let settings = AppSettings {
            default_journal: Some(PathBuf::from("from-settings.db")),
            output_permissions: Some("600".to_string()),
        };

        let cli = Cli::try_parse_from(["logbook", "info"]).unwrap();
        let ctx = Context::resolve(&cli, &settings).unwrap();
        assert_eq!(ctx.journal_path, PathBuf::from("from-settings.db"));
        assert_eq!(ctx.permissions, 0o600);

        let cli = Cli::try_parse_from(["logbook", "--path", "x.db", "--operm", "644", "info"]).unwrap();
        let ctx = Context::resolve(&cli, &settings).unwrap();
        assert_eq!(ctx.journal_path, PathBuf::from("x.db"));
        assert_eq!(ctx.permissions, 0o644);
    }

    #[test]
    fn test_resolve_defaults() {
        let cli = Cli::try_parse_from(["logbook", "info"]).unwrap();
        let ctx = Context::resolve(&cli, &AppSettings::default()).unwrap();
        assert_eq!(ctx.journal_path, PathBuf::from("diary.db"));
        assert_eq!(ctx.permissions, DEFAULT_PERMISSIONS);
    }

    #[test]
    fn test_resolve_rejects_bad_permissions() {
        let cli = Cli::try_parse_from(["logbook", "--operm", "rwx", "info"]).unwrap();
        assert!(Context::resolve(&cli, &AppSettings::default()).is_err());
    }

    #[test]
    fn test_add_with_attachment_then_resume() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let photo = tmp.path().join("photo.jpg");
        fs::write(&photo, [1u8, 2, 3]).unwrap();

        add_note(&ctx, "sunset", "2024-03-05 18:30", vec![photo]);

        let mut buf = Vec::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5);
        resume(&ctx, DateArgs { date }, &mut buf).unwrap();
        let text = output(buf);

        assert!(text.contains("2024-03-05 18:30:00 --> 2024-03-05 18:30:00"));
        assert!(text.contains("sunset"));
        assert!(text.contains("photo.jpg (3.000 B)"));
    }

    #[test]
    fn test_add_reports_missing_attachment() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let args = AddArgs {
            note: "x".to_string(),
            start: None,
            end: None,
            attachments: vec![tmp.path().join("missing.bin")],
        };

        let mut buf = Vec::new();
        assert!(add(&ctx, args, &mut buf).is_err());
        assert!(output(buf).contains("Inserted, with id #1"));
    }

    #[test]
    fn test_add_rejects_end_before_start() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let args = AddArgs {
            note: "x".to_string(),
            start: Some(crate::cli::parse_datetime("2024-03-05 10:00").unwrap()),
            end: Some(crate::cli::parse_datetime("2024-03-05 09:00").unwrap()),
            attachments: vec![],
        };
        assert!(add(&ctx, args, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_delete_hides_entry_from_resume() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        add_note(&ctx, "gone soon", "2024-03-05 09:00", vec![]);

        delete(&ctx, IdArgs { id: 1 }).unwrap();

        let mut buf = Vec::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5);
        resume(&ctx, DateArgs { date }, &mut buf).unwrap();
        assert!(buf.is_empty());
        assert!(delete(&ctx, IdArgs { id: 42 }).is_err());
    }

    #[test]
    fn test_fetch_to_stdout_and_file() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let src = tmp.path().join("notes.txt");
        fs::write(&src, "hello").unwrap();
        add_note(&ctx, "with file", "2024-03-05 09:00", vec![src]);

        let mut buf = Vec::new();
        let args = FetchArgs {
            id: 1,
            output: PathBuf::from("-"),
        };
        fetch(&ctx, args, &mut buf).unwrap();
        assert_eq!(buf, b"hello");

        let dest = tmp.path().join("copy.txt");
        let args = FetchArgs {
            id: 1,
            output: dest.clone(),
        };
        fetch(&ctx, args, &mut Vec::new()).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "hello");
    }

    #[test]
    fn test_dump_refuses_to_clear_journal_directory() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        add_note(&ctx, "x", "2024-03-05 09:00", vec![]);

        let args = DumpArgs {
            root: tmp.path().to_path_buf(),
            force: true,
        };
        let err = dump(&ctx, args, &mut Vec::new()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LogbookError>(),
            Some(LogbookError::UnsafeExportTarget(_))
        ));
        assert!(ctx.journal_path.exists());
    }

    #[test]
    fn test_dump_writes_tree() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        add_note(&ctx, "x", "2024-03-05 09:00", vec![]);
        let root = tmp.path().join("site");

        let mut buf = Vec::new();
        let args = DumpArgs {
            root: root.clone(),
            force: false,
        };
        dump(&ctx, args, &mut buf).unwrap();

        assert!(root.join("2024/03/05/index.html").exists());
        assert!(output(buf).starts_with("Exported 1 days (1 entries, 0 attachments)"));
    }

    #[test]
    fn test_dump_day_into_directory() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        add_note(&ctx, "x", "2024-03-05 09:00", vec![]);
        let dir = tmp.path().join("day");

        let args = DumpDayArgs {
            date: NaiveDate::from_ymd_opt(2024, 3, 5),
            output_dir: dir.clone(),
        };
        dump_day(&ctx, args, &mut Vec::new()).unwrap();

        let page = fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(page.contains("<title>2024-03-05</title>"));
    }

    #[test]
    fn test_info_counts() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let src = tmp.path().join("a.bin");
        fs::write(&src, [0u8; 1500]).unwrap();
        add_note(&ctx, "one", "2024-03-05 09:00", vec![src]);
        add_note(&ctx, "two", "2024-03-06 09:00", vec![]);

        let mut buf = Vec::new();
        show_info(&ctx, &mut buf).unwrap();
        let text = output(buf);

        assert!(text.contains("Total entries:     2\n"));
        assert!(text.contains("Total attachments: 1 (avg. 0.50 p.e.)\n"));
        assert!(text.contains("Blob total size:   1.500 kB\n"));
    }

    #[test]
    fn test_config_show_and_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");

        let mut buf = Vec::new();
        let args = ConfigArgs {
            journal: None,
            permissions: None,
        };
        config(&path, AppSettings::default(), args, &mut buf).unwrap();
        assert_eq!(output(buf).trim(), "{}");
        assert!(!path.exists());

        let args = ConfigArgs {
            journal: Some(PathBuf::from("/data/diary.db")),
            permissions: Some("640".to_string()),
        };
        config(&path, AppSettings::default(), args, &mut Vec::new()).unwrap();

        let saved = settings::load_from(&path);
        assert_eq!(saved.default_journal, Some(PathBuf::from("/data/diary.db")));
        assert_eq!(saved.output_permissions.as_deref(), Some("640"));
    }

    #[test]
    fn test_config_rejects_bad_permissions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let args = ConfigArgs {
            journal: None,
            permissions: Some("999".to_string()),
        };
        assert!(config(&path, AppSettings::default(), args, &mut Vec::new()).is_err());
        assert!(!path.exists());
    }
}
