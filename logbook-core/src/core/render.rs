//! HTML and plain-text rendering for exported pages.
//!
//! Pages are built from their inputs alone (no clock, no environment), so an
//! unchanged journal always renders byte-identical output.

use std::fmt::Write as _;
use std::path::Path;

use log::debug;
use pulldown_cmark::{html as md_html, Event, Options, Parser};

use crate::core::attachment::is_plain_file_name;
use crate::core::entry::to_local;
use crate::core::fs::write_file;
use crate::{Attachment, Entry, LogbookError, Result};

/// Format used for entry start/end times on every page.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STYLE: &str = "body{font-family:sans-serif;max-width:50em;margin:2em auto;padding:0 1em}\
nav{font-size:.9em;margin-bottom:1em}\
.record-id{font-weight:bold;margin-right:.5em}\
.time{color:#555}\
table{border-collapse:collapse;margin-top:.5em}\
th,td{border:1px solid #ccc;padding:.2em .6em;text-align:left}";

/// One link on a generated page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Partition key of the target (`"2024"`, `"03"`, ...); empty for the export root.
    pub key: String,
    /// Relative URL from the page that contains the link.
    pub href: String,
    /// Text shown for the link.
    pub label: String,
}

/// An entry together with its attachments, as shown on a day page.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub entry: Entry,
    pub attachments: Vec<Attachment>,
}

// ── Escaping ─────────────────────────────────────────────────────────────────

/// Escapes HTML special characters in a user-supplied string.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Percent-encodes a file name for use as a relative `href`.
fn href_escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

// ── Markdown rendering ────────────────────────────────────────────────────────

/// Converts a note body from CommonMark to HTML.
///
/// Raw HTML in the note is shown as text, and single line breaks are kept as
/// `<br>` so notes typed as plain lines read the same as in the terminal.
pub fn render_note_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut html_output = String::new();
    md_html::push_html(&mut html_output, parser);
    html_output
}

// ── Sizes and times ──────────────────────────────────────────────────────────

/// Formats a byte count with decimal prefixes, e.g. `3.000 B` or `1.500 kB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["", "k", "M", "G"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size > 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    format!("{size:.3} {}B", UNITS[unit])
}

/// Formats a Unix timestamp in local time with [`DATETIME_FORMAT`].
pub fn format_timestamp(timestamp: i64) -> String {
    to_local(timestamp)
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| format!("@{timestamp}"))
}

// ── Pages ────────────────────────────────────────────────────────────────────

fn push_page_head(out: &mut String, title: &str, breadcrumb: &[PageLink]) {
    let title = html_escape(title);
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html>");
    let _ = writeln!(out, "<head>");
    let _ = writeln!(out, "<meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{title}</title>");
    let _ = writeln!(out, "<style>{STYLE}</style>");
    let _ = writeln!(out, "</head>");
    let _ = writeln!(out, "<body>");
    if !breadcrumb.is_empty() {
        let links: Vec<String> = breadcrumb
            .iter()
            .map(|link| {
                format!(
                    "<a href=\"{}\">{}</a>",
                    html_escape(&link.href),
                    html_escape(&link.label)
                )
            })
            .collect();
        let _ = writeln!(out, "<nav class=\"breadcrumb\">{}</nav>", links.join(" / "));
    }
    let _ = writeln!(out, "<h1>{title}</h1>");
}

fn push_page_tail(out: &mut String) {
    let _ = writeln!(out, "</body>");
    let _ = writeln!(out, "</html>");
}

/// Renders a directory index: a title, the breadcrumb back to the export root,
/// and one list item per child in the given order.
pub fn render_index_page(title: &str, breadcrumb: &[PageLink], children: &[PageLink]) -> Vec<u8> {
    let mut out = String::new();
    push_page_head(&mut out, title, breadcrumb);

    let _ = writeln!(out, "<ul class=\"children\">");
    for child in children {
        let _ = writeln!(
            out,
            "<li><a href=\"{}\">{}</a></li>",
            html_escape(&child.href),
            html_escape(&child.label)
        );
    }
    let _ = writeln!(out, "</ul>");

    push_page_tail(&mut out);
    out.into_bytes()
}

/// Renders the detail page of one day and rehydrates every attachment into `out_dir`.
///
/// Attachments are written as they are rendered, named by their stored file
/// name; two attachments with the same name on one day leave the last one on
/// disk. The page itself is returned, not written.
///
/// # Errors
///
/// Returns [`LogbookError::InvalidAttachmentName`] for a stored name that is
/// not a plain file name, or [`LogbookError::Io`] if an attachment cannot be
/// written. Rendering stops at the first failure.
pub fn render_day_detail(
    title: &str,
    breadcrumb: &[PageLink],
    records: &[DayRecord],
    out_dir: &Path,
    permissions: u32,
) -> Result<Vec<u8>> {
    let mut out = String::new();
    push_page_head(&mut out, title, breadcrumb);

    for record in records {
        let entry = &record.entry;
        debug!("rendering entry #{}", entry.id);

        let _ = writeln!(out, "<div class=\"record\" id=\"entry-{}\">", entry.id);
        let _ = writeln!(
            out,
            "<p><span class=\"record-id\">#{}</span><span class=\"time\">From {} to {}</span></p>",
            entry.id,
            format_timestamp(entry.start),
            format_timestamp(entry.end)
        );
        let _ = writeln!(out, "<div class=\"note\">{}</div>", render_note_html(&entry.note));

        if !record.attachments.is_empty() {
            let _ = writeln!(
                out,
                "<table class=\"attachments\"><tr><th>#</th><th>Size</th><th>Name</th></tr>"
            );
            for attachment in &record.attachments {
                if !is_plain_file_name(&attachment.name) {
                    return Err(LogbookError::InvalidAttachmentName(attachment.name.clone()));
                }
                debug!("rehydrating attachment #{}", attachment.id);
                write_file(&out_dir.join(&attachment.name), &attachment.content, permissions)?;

                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td><a href=\"{}\" target=\"_blank\">{}</a></td></tr>",
                    attachment.id,
                    format_size(attachment.size() as u64),
                    href_escape(&attachment.name),
                    html_escape(&attachment.name)
                );
            }
            let _ = writeln!(out, "</table>");
        }
        let _ = writeln!(out, "</div>");
        let _ = writeln!(out, "<hr>");
    }

    push_page_tail(&mut out);
    Ok(out.into_bytes())
}

/// Renders a plain-text summary of a day's entries for terminal output.
///
/// ```text
/// [1] 2024-03-05 09:00:00 --> 2024-03-05 10:00:00
/// -----------------------------------------------
/// note text
/// -----------------------------------------------
/// Attachments:
/// [3] photo.jpg (3.000 B)
/// -----------------------------------------------
/// ```
pub fn render_resume(records: &[DayRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let entry = &record.entry;
        let header = format!(
            "[{}] {} --> {}",
            entry.id,
            format_timestamp(entry.start),
            format_timestamp(entry.end)
        );
        let rule = "-".repeat(header.chars().count());

        let _ = writeln!(out, "{header}");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{}", entry.note);

        if !record.attachments.is_empty() {
            let _ = writeln!(out, "{rule}");
            let _ = writeln!(out, "Attachments:");
            for attachment in &record.attachments {
                let _ = writeln!(
                    out,
                    "[{}] {} ({})",
                    attachment.id,
                    attachment.name,
                    format_size(attachment.size() as u64)
                );
            }
            let _ = writeln!(out, "{rule}");
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: i64, note: &str) -> Entry {
        Entry {
            id,
            start: 1_709_629_200,
            end: 1_709_632_800,
            inserted: 1_709_629_200,
            note: note.to_string(),
            deleted: false,
        }
    }

    fn attachment(id: i64, name: &str, content: &[u8]) -> Attachment {
        Attachment {
            id,
            entry_id: 1,
            name: name.to_string(),
            inserted: 0,
            content: content.to_vec(),
        }
    }

    fn link(key: &str, href: &str) -> PageLink {
        PageLink {
            key: key.to_string(),
            href: href.to_string(),
            label: key.to_string(),
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(3), "3.000 B");
        assert_eq!(format_size(1000), "1000.000 B");
        assert_eq!(format_size(1500), "1.500 kB");
        assert_eq!(format_size(2_500_000), "2.500 MB");
        assert_eq!(format_size(5_000_000_000_000), "5000.000 GB");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_href_escape() {
        assert_eq!(href_escape("photo.jpg"), "photo.jpg");
        assert_eq!(href_escape("my file#1.txt"), "my%20file%231.txt");
    }

    #[test]
    fn test_note_html_escapes_raw_html_and_keeps_lines() {
        let html = render_note_html("first line\nsecond <script>x</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<br />"));
    }

    #[test]
    fn test_note_html_renders_markdown() {
        let html = render_note_html("**bold**");
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_index_page_lists_children_in_order() {
        let children = vec![link("03", "03/index.html"), link("11", "11/index.html")];
        let page = String::from_utf8(render_index_page("2024", &[], &children)).unwrap();

        let first = page.find("href=\"03/index.html\"").unwrap();
        let second = page.find("href=\"11/index.html\"").unwrap();
        assert!(first < second);
        assert!(page.contains("<title>2024</title>"));
        assert!(!page.contains("<nav"));
    }

    #[test]
    fn test_index_page_is_deterministic() {
        let crumbs = vec![link("", "../index.html")];
        let children = vec![link("05", "05/index.html")];
        assert_eq!(
            render_index_page("2024-03", &crumbs, &children),
            render_index_page("2024-03", &crumbs, &children)
        );
    }

    #[test]
    fn test_day_detail_writes_attachments() {
        let tmp = TempDir::new().unwrap();
        let records = vec![
            DayRecord {
                entry: entry(1, "no files"),
                attachments: vec![],
            },
            DayRecord {
                entry: entry(2, "with photo"),
                attachments: vec![attachment(9, "photo.jpg", b"abc")],
            },
        ];

        let page = render_day_detail("2024-03-05", &[], &records, tmp.path(), 0o644).unwrap();
        let page = String::from_utf8(page).unwrap();

        assert_eq!(page.matches("class=\"record\"").count(), 2);
        assert_eq!(page.matches("<table").count(), 1);
        assert!(page.contains("<a href=\"photo.jpg\" target=\"_blank\">photo.jpg</a>"));
        assert!(page.contains("3.000 B"));
        assert_eq!(std::fs::read(tmp.path().join("photo.jpg")).unwrap(), b"abc");
    }

    #[test]
    fn test_day_detail_same_name_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let records = vec![DayRecord {
            entry: entry(1, "dupes"),
            attachments: vec![
                attachment(1, "a.txt", b"first"),
                attachment(2, "a.txt", b"second"),
            ],
        }];

        render_day_detail("d", &[], &records, tmp.path(), 0o644).unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.txt")).unwrap(), b"second");
    }

    #[test]
    fn test_day_detail_fails_when_attachment_cannot_be_written() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("photo.jpg")).unwrap();
        let records = vec![DayRecord {
            entry: entry(1, "x"),
            attachments: vec![attachment(1, "photo.jpg", b"abc")],
        }];

        let result = render_day_detail("d", &[], &records, tmp.path(), 0o644);
        assert!(matches!(result, Err(LogbookError::Io(_))));
    }

    #[test]
    fn test_day_detail_rejects_path_names() {
        let tmp = TempDir::new().unwrap();
        let records = vec![DayRecord {
            entry: entry(1, "x"),
            attachments: vec![attachment(1, "../evil", b"abc")],
        }];

        let result = render_day_detail("d", &[], &records, tmp.path(), 0o644);
        assert!(matches!(result, Err(LogbookError::InvalidAttachmentName(_))));
    }

    #[test]
    fn test_resume_lists_attachments() {
        let records = vec![DayRecord {
            entry: entry(4, "walked the dog"),
            attachments: vec![attachment(7, "map.png", &[0; 1500])],
        }];

        let text = render_resume(&records);

        assert!(text.starts_with("[4] "));
        assert!(text.contains("walked the dog\n"));
        assert!(text.contains("Attachments:\n[7] map.png (1.500 kB)\n"));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "-".repeat(lines[0].chars().count()));
    }
}
