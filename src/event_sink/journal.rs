//! JSON-lines journal sink
//!
//! Each entry is appended as one JSON object per line. Stands in for an OS
//! event log on hosts that do not have one.
//!
//! The journal is shared by every script logging to the same directory, so
//! it is size-bounded: once it grows past the limit it is renamed to
//! `events_archived_<yyyyMMdd_HHmmss>.jsonl` and a fresh file is started.
//! Only the newest few journal archives are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{EventEntry, EventSink, SinkError};
use crate::rotation;

/// Default journal file name inside the log directory
pub const JOURNAL_FILE: &str = "events.jsonl";

/// Roll the journal over once it is larger than this (default: 10 MiB)
pub const DEFAULT_JOURNAL_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Journal archives kept after a rollover
pub const DEFAULT_JOURNAL_ARCHIVES: usize = 5;

/// Appends entries to a JSON-lines file
#[derive(Debug)]
pub struct JournalSink {
    path: PathBuf,
    max_size_bytes: u64,
    max_archives: usize,
    file: Option<File>,
    source: Option<String>,
}

#[derive(Serialize)]
struct Registration<'a> {
    registered_source: &'a str,
    timestamp: String,
}

impl JournalSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: DEFAULT_JOURNAL_MAX_BYTES,
            max_archives: DEFAULT_JOURNAL_ARCHIVES,
            file: None,
            source: None,
        }
    }

    /// Journal at the default file name inside `log_dir`
    pub fn in_dir(log_dir: &Path) -> Self {
        Self::new(log_dir.join(JOURNAL_FILE))
    }

    pub fn with_max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// How many rolled-over journals to keep; older ones are deleted
    pub fn with_max_archives(mut self, count: usize) -> Self {
        self.max_archives = count;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source registered with this journal, if any
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Rolled-over journals, oldest first
    ///
    /// Ordered by last write rather than name: a pruned archive name can be
    /// reused by a later rollover in the same second.
    pub fn archives(&self) -> Vec<PathBuf> {
        let (dir, stem, extension) = self.archive_parts();
        let mut archives = rotation::list_matching(&dir, |name| {
            rotation::is_timestamped_archive_name(name, &stem, &extension)
        })
        .unwrap_or_default();
        archives.sort_by_cached_key(|p| {
            let modified = fs::metadata(p).and_then(|m| m.modified()).ok();
            (modified, p.clone())
        });
        archives
    }

    fn archive_parts(&self) -> (PathBuf, String, String) {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let part = |p: Option<&std::ffi::OsStr>| {
            p.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        (dir, part(self.path.file_stem()), part(self.path.extension()))
    }

    /// The open journal, rolled over first if it has grown past the limit
    fn current_file(&mut self) -> Result<&mut File, SinkError> {
        let len = match fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Rolled over by another logger sharing this directory
                self.file = None;
                0
            }
            Err(e) => return Err(e.into()),
        };

        if len > self.max_size_bytes {
            self.roll_over()?;
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }

    fn roll_over(&mut self) -> Result<(), SinkError> {
        let (dir, stem, extension) = self.archive_parts();
        let archive =
            rotation::timestamped_archive_path(&dir, &stem, &extension, &chrono::Local::now());
        self.file = None;
        fs::rename(&self.path, &archive)?;
        tracing::debug!("Rolled journal {} over to {}", self.path.display(), archive.display());

        let archives = self.archives();
        let excess = archives.len().saturating_sub(self.max_archives);
        for old in &archives[..excess] {
            if let Err(e) = fs::remove_file(old) {
                tracing::warn!("Could not delete old journal {}: {}", old.display(), e);
            }
        }
        Ok(())
    }
}

impl EventSink for JournalSink {
    fn register_source(&mut self, source: &str) -> Result<(), SinkError> {
        if source.trim().is_empty() {
            return Err(SinkError::Registration {
                source_name: source.to_string(),
                reason: "source name is empty".to_string(),
            });
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = Registration {
            registered_source: source,
            timestamp: chrono::Local::now().to_rfc3339(),
        };
        let line = serde_json::to_string(&record)?;
        writeln!(self.current_file()?, "{}", line)?;

        self.source = Some(source.to_string());
        Ok(())
    }

    fn write_entry(&mut self, entry: &EventEntry) -> Result<(), SinkError> {
        if self.source.is_none() {
            return Err(SinkError::NotRegistered);
        }
        let line = serde_json::to_string(entry)?;
        let file = self.current_file()?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::local;
    use crate::level::Severity;
    use tempfile::TempDir;

    fn entry(message: &str) -> EventEntry {
        EventEntry {
            timestamp: local(2026, 4, 2, 10, 0, 0),
            source: "Demo".to_string(),
            event_id: 3000,
            severity: Severity::Error,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_write_before_register_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = JournalSink::in_dir(temp_dir.path());
        assert!(matches!(
            sink.write_entry(&entry("x")),
            Err(SinkError::NotRegistered)
        ));
    }

    #[test]
    fn test_register_and_write() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = JournalSink::in_dir(&temp_dir.path().join("nested"));
        sink.register_source("Demo").unwrap();
        assert_eq!(sink.source(), Some("Demo"));
        sink.write_entry(&entry("first")).unwrap();
        sink.write_entry(&entry("second")).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"registered_source\":\"Demo\""));

        let parsed: EventEntry = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed.message, "second");
        assert_eq!(parsed.event_id, 3000);
    }

    #[test]
    fn test_journal_rolls_over_and_keeps_newest_archives() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = JournalSink::in_dir(temp_dir.path())
            .with_max_size_bytes(200)
            .with_max_archives(2);
        sink.register_source("Demo").unwrap();

        let long = "x".repeat(250);
        for i in 0..5 {
            sink.write_entry(&entry(&format!("{} {}", i, long))).unwrap();
        }

        // Every entry is over the limit on its own, so each write after the
        // first starts a new journal
        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: EventEntry = serde_json::from_str(lines[0]).unwrap();
        assert!(parsed.message.starts_with("4 "));

        let archives = sink.archives();
        assert_eq!(archives.len(), 2);
        let newest = fs::read_to_string(&archives[1]).unwrap();
        assert!(newest.contains("\"3 xxx"));
    }

    #[test]
    fn test_journal_reopens_after_external_rollover() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = JournalSink::in_dir(temp_dir.path());
        sink.register_source("Demo").unwrap();
        fs::rename(sink.path(), temp_dir.path().join("moved.jsonl")).unwrap();

        sink.write_entry(&entry("after move")).unwrap();
        let content = fs::read_to_string(sink.path()).unwrap();
        assert!(content.contains("after move"));
    }

    #[test]
    fn test_register_empty_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = JournalSink::in_dir(temp_dir.path());
        assert!(matches!(
            sink.register_source("  "),
            Err(SinkError::Registration { .. })
        ));
    }
}
