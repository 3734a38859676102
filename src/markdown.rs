//! Markdown log format: header block, activity rows, and row parsing

use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::{LogError, LogResult};
use crate::identity::Identity;
use crate::level::Level;

/// Timestamp format used in headers and rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TABLE_HEADER: &str = "| Timestamp | Level | Message |";
const TABLE_RULE: &str = "|-----------|-------|---------|";

/// Why a fresh log file replaced the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverNote {
    pub reason: String,
    pub archived_as: String,
}

/// First line of every log file written for `script_name`
pub fn title(script_name: &str) -> String {
    format!("# {} Log", script_name)
}

/// Render the fixed header block of a new log file
pub fn header(identity: &Identity, started: &DateTime<Local>, note: Option<&RolloverNote>) -> String {
    let mut out = format!(
        "{}\n\n\
         **Script Version:** {}\n\
         **Log Started:** {}\n\
         **Computer:** {}\n\
         **User:** {}\n",
        title(&identity.script_name),
        identity.script_version,
        started.format(TIMESTAMP_FORMAT),
        identity.computer,
        identity.user,
    );
    if let Some(note) = note {
        out.push_str(&format!(
            "**Rollover:** {}; previous log archived as {}\n",
            note.reason, note.archived_as
        ));
    }
    out.push_str("\n---\n\n## Activity Log\n\n");
    out.push_str(TABLE_HEADER);
    out.push('\n');
    out.push_str(TABLE_RULE);
    out.push('\n');
    out
}

/// Render one activity row, including the trailing newline
pub fn row(timestamp: &DateTime<Local>, level: Level, message: &str) -> String {
    format!(
        "| {} | {} | {} |\n",
        timestamp.format(TIMESTAMP_FORMAT),
        level.tag(),
        escape_cell(message)
    )
}

/// Escape text so it stays inside one table cell
pub fn escape_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '|' => out.push_str("\\|"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br>");
            }
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_cell`]
pub fn unescape_cell(text: &str) -> String {
    text.replace("<br>", "\n").replace("\\|", "|")
}

/// A parsed activity row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: NaiveDateTime,
    pub level: Level,
    pub message: String,
}

/// Parse a single activity row
///
/// Returns `None` for header lines, the table header and rule, and anything
/// else that is not a `| timestamp | [TAG] | message |` row.
pub fn parse_row(line: &str) -> Option<LogRow> {
    let line = line.trim_end_matches(['\r', '\n']);
    let inner = line.strip_prefix("| ")?.strip_suffix(" |")?;

    let (timestamp, rest) = inner.split_once(" | ")?;
    let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;

    let (tag, message) = rest.split_once(" | ")?;
    let level = Level::from_tag(tag)?;

    Some(LogRow {
        timestamp,
        level,
        message: unescape_cell(message),
    })
}

/// Parse all activity rows of a log file's contents
pub fn parse_rows(content: &str) -> Vec<LogRow> {
    content.lines().filter_map(parse_row).collect()
}

/// Read and parse the activity rows of a log file
pub fn read_entries(path: &Path) -> LogResult<Vec<LogRow>> {
    let content = std::fs::read_to_string(path).map_err(|source| LogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_rows(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::local;

    fn identity() -> Identity {
        Identity {
            script_name: "Demo".to_string(),
            script_version: "2.0".to_string(),
            computer: "HOST01".to_string(),
            user: "admin".to_string(),
        }
    }

    #[test]
    fn test_header_layout() {
        let h = header(&identity(), &local(2026, 10, 18, 9, 5, 0), None);
        let expected = "# Demo Log\n\n\
                        **Script Version:** 2.0\n\
                        **Log Started:** 2026-10-18 09:05:00\n\
                        **Computer:** HOST01\n\
                        **User:** admin\n\
                        \n---\n\n## Activity Log\n\n\
                        | Timestamp | Level | Message |\n\
                        |-----------|-------|---------|\n";
        assert_eq!(h, expected);
        assert!(parse_rows(&h).is_empty());
    }

    #[test]
    fn test_header_with_rollover_note() {
        let note = RolloverNote {
            reason: "month changed".to_string(),
            archived_as: "Demo.2026-09.md".to_string(),
        };
        let h = header(&identity(), &local(2026, 10, 1, 0, 0, 1), Some(&note));
        assert!(h.contains("**Rollover:** month changed; previous log archived as Demo.2026-09.md\n"));
        assert!(parse_rows(&h).is_empty());
    }

    #[test]
    fn test_row_format() {
        let r = row(&local(2026, 10, 18, 14, 30, 45), Level::Success, "done");
        assert_eq!(r, "| 2026-10-18 14:30:45 | [OK] | done |\n");
    }

    #[test]
    fn test_parse_row() {
        let parsed = parse_row("| 2026-10-18 14:30:45 | [WARN] | disk almost full |").unwrap();
        assert_eq!(parsed.level, Level::Warning);
        assert_eq!(parsed.message, "disk almost full");
        assert_eq!(parsed.timestamp.to_string(), "2026-10-18 14:30:45");
    }

    #[test]
    fn test_parse_row_rejects_table_header() {
        assert!(parse_row(TABLE_HEADER).is_none());
        assert!(parse_row(TABLE_RULE).is_none());
        assert!(parse_row("**User:** admin").is_none());
    }

    #[test]
    fn test_escaped_message_survives_parse() {
        let message = "a | b\nsecond line";
        let r = row(&local(2026, 1, 2, 3, 4, 5), Level::Error, message);
        assert_eq!(r.lines().count(), 1);
        let parsed = parse_row(&r).unwrap();
        assert_eq!(parsed.message, message);
        assert_eq!(parsed.level, Level::Error);
    }

    #[test]
    fn test_crlf_becomes_single_break() {
        assert_eq!(escape_cell("one\r\ntwo"), "one<br>two");
    }

    #[test]
    fn test_empty_message_row() {
        let r = row(&local(2026, 1, 2, 3, 4, 5), Level::Info, "");
        let parsed = parse_row(&r).unwrap();
        assert_eq!(parsed.message, "");
    }
}
