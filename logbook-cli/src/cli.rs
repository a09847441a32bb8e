//! Command-line argument model.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "logbook",
    author,
    version,
    about = "Personal log book of dated notes and attachments",
    long_about = "Records dated notes with optional attachments in a SQLite journal \
                  and exports the journal as a static site of YYYY/MM/DD pages."
)]
pub struct Cli {
    /// Journal database file [default: from settings, else diary.db]
    #[arg(long, global = true, env = "LOGBOOK_PATH")]
    pub path: Option<PathBuf>,

    /// Print progress information on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Permissions of written files as three octal digits [default: from settings, else 660]
    #[arg(long, global = true, value_name = "OCTAL")]
    pub operm: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Add an entry, optionally with attachments")]
    Add(AddArgs),

    #[command(about = "Attach files to an existing entry")]
    Attach(AttachArgs),

    #[command(about = "Print the entries of one day")]
    Resume(DateArgs),

    #[command(about = "Mark an entry as deleted")]
    Delete(IdArgs),

    #[command(about = "Write the content of an attachment to a file or stdout")]
    Fetch(FetchArgs),

    #[command(about = "Export one day as an HTML page plus its attachments")]
    DumpDay(DumpDayArgs),

    #[command(about = "Export the whole journal as a YYYY/MM/DD static site")]
    Dump(DumpArgs),

    #[command(about = "Show journal statistics")]
    Info,

    #[command(about = "Show or change persisted defaults")]
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Note text (CommonMark)
    #[arg(short, long)]
    pub note: String,

    /// Start time, `YYYY-MM-DD[ HH:MM[:SS]]` [default: now]
    #[arg(long, value_parser = parse_datetime)]
    pub start: Option<NaiveDateTime>,

    /// End time, same format as --start [default: start]
    #[arg(long, value_parser = parse_datetime)]
    pub end: Option<NaiveDateTime>,

    /// Files to attach to the new entry
    #[arg(short, long = "attach", value_name = "FILE", num_args = 1..)]
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AttachArgs {
    #[arg(long)]
    pub id: i64,

    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DateArgs {
    /// Day to show, `YYYY-MM-DD` [default: today]
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[arg(long)]
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Attachment id
    #[arg(long)]
    pub id: i64,

    /// Destination file, or `-` for stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct DumpDayArgs {
    /// Day to export, `YYYY-MM-DD` [default: today]
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Directory receiving index.html and the attachments
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Export root
    #[arg(default_value = ".", value_name = "ROOT")]
    pub root: PathBuf,

    /// Delete the previous content of ROOT before exporting
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Journal used when --path is not given
    #[arg(long, value_name = "DB")]
    pub journal: Option<PathBuf>,

    /// File permissions used when --operm is not given
    #[arg(long, value_name = "OCTAL")]
    pub permissions: Option<String>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Accepts a date alone (midnight) or a date followed by `HH:MM` or `HH:MM:SS`.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    parse_date(value)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| format!("expected YYYY-MM-DD[ HH:MM[:SS]], got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dump_with_force() {
        let cli = Cli::try_parse_from(["logbook", "dump", "site", "-f"]).unwrap();
        match cli.command {
            Commands::Dump(args) => {
                assert_eq!(args.root, PathBuf::from("site"));
                assert!(args.force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_dump_root_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["logbook", "dump"]).unwrap();
        let Commands::Dump(args) = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(args.root, PathBuf::from("."));
        assert!(!args.force);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logbook", "info", "--path", "my.db", "-v", "--operm", "640",
        ])
        .unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("my.db")));
        assert!(cli.verbose);
        assert_eq!(cli.operm.as_deref(), Some("640"));
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "logbook",
            "add",
            "--note",
            "hello",
            "--start",
            "2024-03-05 09:30",
            "--attach",
            "a.jpg",
            "b.txt",
        ])
        .unwrap();
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.note, "hello");
        assert_eq!(
            args.start,
            Some(
                NaiveDate::from_ymd_opt(2024, 3, 5)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(args.end, None);
        assert_eq!(args.attachments.len(), 2);
    }

    #[test]
    fn test_dump_day_is_kebab_case() {
        let cli = Cli::try_parse_from(["logbook", "dump-day", "--date", "2024-03-05"]).unwrap();
        let Commands::DumpDay(args) = cli.command else {
            panic!("expected dump-day");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(args.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_attach_requires_files() {
        assert!(Cli::try_parse_from(["logbook", "attach", "--id", "3"]).is_err());
    }

    #[test]
    fn test_parse_datetime_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            parse_datetime("2024-03-05 10:11:12").unwrap(),
            day.and_hms_opt(10, 11, 12).unwrap()
        );
        assert_eq!(
            parse_datetime("2024-03-05").unwrap(),
            day.and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_datetime("05/03/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }
}
