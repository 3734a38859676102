//! Diagnostics for failures the logger swallows
//!
//! The logger never returns errors from `write`. Anything it drops is
//! reported here instead: as a `tracing` warning, and to an optional
//! callback. [`DiagnosticBuffer`] is a ready-made callback target.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};

/// What kind of failure was swallowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Directory or file creation failed during initialization
    InitFailed,
    /// `write` was called on a logger that has no active file
    NotInitialized,
    /// Archiving the active file failed
    RotationFailed,
    /// Appending a row failed
    AppendFailed,
    /// The event sink failed and has been switched off
    SinkDisabled,
    /// Deleting expired archives failed
    CleanupFailed,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::InitFailed => "init-failed",
            DiagnosticKind::NotInitialized => "not-initialized",
            DiagnosticKind::RotationFailed => "rotation-failed",
            DiagnosticKind::AppendFailed => "append-failed",
            DiagnosticKind::SinkDisabled => "sink-disabled",
            DiagnosticKind::CleanupFailed => "cleanup-failed",
        }
    }
}

/// A single swallowed failure
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub timestamp: DateTime<Local>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            message: message.into(),
        }
    }
}

/// Callback invoked for every diagnostic
pub type DiagnosticHandler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Thread-safe ring buffer of recent diagnostics
pub struct DiagnosticBuffer {
    entries: RwLock<VecDeque<Diagnostic>>,
    max_entries: usize,
}

impl DiagnosticBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        if self.max_entries == 0 {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(diagnostic);
        }
    }

    /// Get all diagnostics, oldest first
    pub fn all(&self) -> Vec<Diagnostic> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries
            .read()
            .map(|e| e.iter().filter(|d| d.kind == kind).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// A handler that pushes into this buffer
    pub fn handler(self: &Arc<Self>) -> DiagnosticHandler {
        let buffer = Arc::clone(self);
        Arc::new(move |d: &Diagnostic| buffer.push(d.clone()))
    }
}
