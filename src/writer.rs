//! The log writer
//!
//! A [`Logger`] owns one active markdown file per script. Every write checks
//! the rotation policy, appends a row, echoes it to the console and mirrors
//! it to the event sink. None of this can fail from the caller's point of
//! view: problems become diagnostics.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::clock::{Clock, SystemClock};
use crate::config;
use crate::console::Console;
use crate::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticKind};
use crate::error::{LogError, LogResult};
use crate::event_sink::{EventContext, EventEntry, EventSink, JournalSink};
use crate::identity::Identity;
use crate::level::Level;
use crate::markdown::{self, RolloverNote};
use crate::retention;
use crate::rotation::{self, MonthArchive, RotationCheck};

/// Default rotation threshold: 10 MiB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Builder for a [`Logger`]
pub struct LoggerBuilder {
    identity: Identity,
    log_dir: Option<PathBuf>,
    max_size_bytes: u64,
    event_source: Option<String>,
    sink: Option<Box<dyn EventSink>>,
    console: Option<Console>,
    clock: Arc<dyn Clock>,
    on_diagnostic: Option<DiagnosticHandler>,
    archive_retention_days: Option<u64>,
}

impl LoggerBuilder {
    fn new(identity: Identity) -> Self {
        Self {
            identity,
            log_dir: None,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            event_source: None,
            sink: None,
            console: Some(Console::default()),
            clock: Arc::new(SystemClock),
            on_diagnostic: None,
            archive_retention_days: None,
        }
    }

    /// Directory for the active file and its archives (default `~/.mdlog/logs`)
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Source name registered with the event sink (default: script name)
    pub fn event_source(mut self, source: impl Into<String>) -> Self {
        self.event_source = Some(source.into());
        self
    }

    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn boxed_event_sink(mut self, sink: Option<Box<dyn EventSink>>) -> Self {
        self.sink = sink;
        self
    }

    /// Console echo settings; `None` turns echo off
    pub fn console(mut self, console: Option<Console>) -> Self {
        self.console = console;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the detected host and user
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Callback for failures the logger swallows
    pub fn on_diagnostic(mut self, handler: DiagnosticHandler) -> Self {
        self.on_diagnostic = Some(handler);
        self
    }

    /// Delete this script's archives older than `days` on initialize
    pub fn archive_retention_days(mut self, days: u64) -> Self {
        self.archive_retention_days = Some(days);
        self
    }

    /// Open (or create) the active log file, prune expired archives and
    /// register the event source
    ///
    /// Never fails. If the log directory or file cannot be created the
    /// returned logger is uninitialized: [`Logger::path`] is `None` and
    /// writes only produce diagnostics.
    pub fn initialize(self) -> Logger {
        let log_dir = self.log_dir.unwrap_or_else(config::logs_dir);
        let event_source = self
            .event_source
            .unwrap_or_else(|| self.identity.script_name.clone());
        let retention_days = self.archive_retention_days;

        let mut logger = Logger {
            stem: self.identity.file_stem(),
            identity: self.identity,
            log_dir,
            max_size_bytes: self.max_size_bytes,
            log_file_path: None,
            event_source,
            sink: self.sink,
            event_sink_enabled: false,
            console: self.console,
            clock: self.clock,
            on_diagnostic: self.on_diagnostic,
        };

        match logger.open_active_file() {
            Ok(path) => logger.log_file_path = Some(path),
            Err(e) => {
                logger.report(DiagnosticKind::InitFailed, e.to_string());
                logger.sink = None;
                return logger;
            }
        }

        if let Some(days) = retention_days {
            logger.prune_archives(days);
        }
        logger.register_event_source();
        logger
    }
}

/// Writes leveled messages to a rotating markdown log
pub struct Logger {
    identity: Identity,
    stem: String,
    log_dir: PathBuf,
    max_size_bytes: u64,
    log_file_path: Option<PathBuf>,
    event_source: String,
    sink: Option<Box<dyn EventSink>>,
    event_sink_enabled: bool,
    console: Option<Console>,
    clock: Arc<dyn Clock>,
    on_diagnostic: Option<DiagnosticHandler>,
}

impl Logger {
    pub fn builder(script_name: impl Into<String>, script_version: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(Identity::detect(script_name, script_version))
    }

    /// Initialize with the usual defaults: console echo on and a JSON
    /// journal next to the log file as the event sink
    pub fn initialize(
        script_name: impl Into<String>,
        script_version: impl Into<String>,
        log_dir: Option<PathBuf>,
        max_size_bytes: Option<u64>,
    ) -> Logger {
        let log_dir = log_dir.unwrap_or_else(config::logs_dir);
        Logger::builder(script_name, script_version)
            .event_sink(JournalSink::in_dir(&log_dir))
            .log_dir(log_dir)
            .max_size_bytes(max_size_bytes.unwrap_or(DEFAULT_MAX_SIZE_BYTES))
            .initialize()
    }

    /// Active log file, or `None` if initialization failed
    pub fn path(&self) -> Option<&Path> {
        self.log_file_path.as_deref()
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn event_source(&self) -> &str {
        &self.event_source
    }

    pub fn is_event_sink_enabled(&self) -> bool {
        self.event_sink_enabled
    }

    /// Archives of this script in the log directory, sorted by name
    pub fn archives(&self) -> LogResult<Vec<PathBuf>> {
        rotation::list_archives(&self.log_dir, &self.stem)
    }

    pub fn info(&mut self, message: &str) {
        self.write(message, Level::Info);
    }

    pub fn success(&mut self, message: &str) {
        self.write(message, Level::Success);
    }

    pub fn warning(&mut self, message: &str) {
        self.write(message, Level::Warning);
    }

    pub fn error(&mut self, message: &str) {
        self.write(message, Level::Error);
    }

    pub fn write(&mut self, message: &str, level: Level) {
        self.write_with(message, level, &EventContext::default());
    }

    /// Write a message with structured fields for the event sink
    pub fn write_with(&mut self, message: &str, level: Level, context: &EventContext) {
        let Some(path) = self.log_file_path.clone() else {
            self.report(
                DiagnosticKind::NotInitialized,
                format!("log writer not initialized, dropped: {}", message),
            );
            return;
        };
        let now = self.clock.now();

        if let Err(e) = self.rotate_if_needed(&path, &now) {
            self.report(DiagnosticKind::RotationFailed, e.to_string());
        }

        if let Err(e) = append_row(&path, &now, level, message) {
            self.report(DiagnosticKind::AppendFailed, e.to_string());
        }

        if let Some(console) = &self.console {
            console.echo(&now, level, message);
        }

        if self.event_sink_enabled {
            let entry = EventEntry::new(
                now,
                self.event_source.clone(),
                &self.identity,
                level,
                message,
                context,
            );
            self.mirror_to_sink(&entry);
        }
    }

    fn open_active_file(&self) -> LogResult<PathBuf> {
        fs::create_dir_all(&self.log_dir).map_err(|source| LogError::CreateDir {
            path: self.log_dir.clone(),
            source,
        })?;

        let path = rotation::active_path(&self.log_dir, &self.stem);
        let now = self.clock.now();

        // Size is only checked on write
        match rotation::check(&path, &now, u64::MAX)? {
            RotationCheck::Missing => self.create_with_header(&path, &now, None)?,
            RotationCheck::MonthChanged { last_written } => {
                match rotation::archive_month(&path, &self.log_dir, &self.stem, last_written) {
                    Ok(outcome) => {
                        let note = month_note(&outcome, last_written.stamp());
                        self.create_with_header(&path, &now, Some(&note))?;
                    }
                    Err(e) => self.report(DiagnosticKind::RotationFailed, e.to_string()),
                }
            }
            RotationCheck::Current | RotationCheck::SizeExceeded { .. } => {
                tracing::debug!("Reusing log file {}", path.display());
            }
        }

        Ok(path)
    }

    fn rotate_if_needed(&self, path: &Path, now: &DateTime<Local>) -> LogResult<()> {
        match rotation::check(path, now, self.max_size_bytes)? {
            RotationCheck::Current => Ok(()),
            RotationCheck::Missing => {
                tracing::debug!("Log file {} disappeared, recreating", path.display());
                self.create_with_header(path, now, None)
            }
            RotationCheck::MonthChanged { last_written } => {
                let outcome = rotation::archive_month(path, &self.log_dir, &self.stem, last_written)?;
                let note = month_note(&outcome, last_written.stamp());
                self.create_with_header(path, now, Some(&note))
            }
            RotationCheck::SizeExceeded { size } => {
                let archive = rotation::archive_size(path, &self.log_dir, &self.stem, now)?;
                let note = RolloverNote {
                    reason: format!(
                        "size limit exceeded ({} bytes > {} bytes)",
                        size, self.max_size_bytes
                    ),
                    archived_as: file_name(&archive),
                };
                self.create_with_header(path, now, Some(&note))
            }
        }
    }

    /// Create a new file with the header block; an existing file is left alone
    fn create_with_header(
        &self,
        path: &Path,
        now: &DateTime<Local>,
        note: Option<&RolloverNote>,
    ) -> LogResult<()> {
        let create_err = |source| LogError::CreateFile {
            path: path.to_path_buf(),
            source,
        };
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(create_err(e)),
        };
        file.write_all(markdown::header(&self.identity, now, note).as_bytes())
            .map_err(create_err)?;
        tracing::debug!("Created log file {}", path.display());
        Ok(())
    }

    fn prune_archives(&self, retention_days: u64) {
        if let Err(e) = retention::cleanup_old_archives(&self.log_dir, &self.stem, retention_days) {
            self.report(DiagnosticKind::CleanupFailed, e.to_string());
        }
    }

    fn register_event_source(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match sink.register_source(&self.event_source) {
            Ok(()) => self.event_sink_enabled = true,
            Err(e) => self.disable_sink(format!(
                "event source '{}' unavailable, event sink disabled: {}",
                self.event_source, e
            )),
        }
    }

    fn mirror_to_sink(&mut self, entry: &EventEntry) {
        let Some(sink) = self.sink.as_mut() else {
            self.event_sink_enabled = false;
            return;
        };
        if let Err(e) = sink.write_entry(entry) {
            self.disable_sink(format!("event sink write failed, event sink disabled: {}", e));
        }
    }

    /// Switch the sink off for the rest of this logger's life
    fn disable_sink(&mut self, message: String) {
        self.event_sink_enabled = false;
        self.sink = None;
        self.report(DiagnosticKind::SinkDisabled, message);
    }

    fn report(&self, kind: DiagnosticKind, message: String) {
        tracing::warn!(kind = kind.as_str(), "{}", message);
        if let Some(handler) = &self.on_diagnostic {
            handler(&Diagnostic::new(kind, message));
        }
    }
}

fn append_row(path: &Path, now: &DateTime<Local>, level: Level, message: &str) -> LogResult<()> {
    let append_err = |source| LogError::Append {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(append_err)?;
    file.write_all(markdown::row(now, level, message).as_bytes())
        .map_err(append_err)
}

fn month_note(outcome: &MonthArchive, stamp: String) -> RolloverNote {
    match outcome {
        MonthArchive::Archived(archive) => RolloverNote {
            reason: format!("new month (previous log last written {})", stamp),
            archived_as: file_name(archive),
        },
        MonthArchive::DiscardedStale(archive) => RolloverNote {
            reason: format!(
                "new month (stale log from {} discarded, archive already existed)",
                stamp
            ),
            archived_as: file_name(archive),
        },
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
