//! Structured event sinks
//!
//! The markdown file is the primary record. An event sink is a second,
//! best-effort destination for administrator-facing alerts: an OS event log,
//! a JSON journal, or the process's own `tracing` output.

mod journal;
mod tracing_sink;

pub use journal::JournalSink;
pub use tracing_sink::TracingSink;

use std::io;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Identity;
use crate::level::{Level, Severity};

/// Errors reported by an event sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("event source '{source_name}' could not be registered: {reason}")]
    Registration { source_name: String, reason: String },

    #[error("event sink has no registered source")]
    NotRegistered,

    #[error("event sink I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A destination for structured event entries
pub trait EventSink: Send {
    /// Register `source` with the sink; called once before any write
    fn register_source(&mut self, source: &str) -> Result<(), SinkError>;

    /// Write a single entry
    fn write_entry(&mut self, entry: &EventEntry) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn register_source(&mut self, source: &str) -> Result<(), SinkError> {
        (**self).register_source(source)
    }

    fn write_entry(&mut self, entry: &EventEntry) -> Result<(), SinkError> {
        (**self).write_entry(entry)
    }
}

/// An entry sent to an event sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Local>,
    pub source: String,
    pub event_id: u32,
    pub severity: Severity,
    pub message: String,
}

impl EventEntry {
    pub fn new(
        timestamp: DateTime<Local>,
        source: impl Into<String>,
        identity: &Identity,
        level: Level,
        message: &str,
        context: &EventContext,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            event_id: level.event_id(),
            severity: level.severity(),
            message: expanded_message(identity, level, message, context),
        }
    }
}

/// Optional structured fields attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// What the script was doing
    pub context: Option<String>,
    /// Suggested fix for the administrator
    pub solution: Option<String>,
    /// Which part of the script raised the event
    pub component: Option<String>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_none() && self.solution.is_none() && self.component.is_none()
    }
}

/// Build the event body: identity header, level, message, then any
/// structured fields that were supplied
pub fn expanded_message(
    identity: &Identity,
    level: Level,
    message: &str,
    context: &EventContext,
) -> String {
    let mut body = format!(
        "Script: {} v{}\nComputer: {}\nUser: {}\nLevel: {}\n\nMessage: {}\n",
        identity.script_name,
        identity.script_version,
        identity.computer,
        identity.user,
        level.as_str(),
        message,
    );

    let fields = [
        ("Context", &context.context),
        ("Solution", &context.solution),
        ("Component", &context.component),
    ];
    if !context.is_empty() {
        body.push('\n');
    }
    for (name, value) in fields {
        if let Some(value) = value {
            body.push_str(&format!("{}: {}\n", name, value));
        }
    }
    body
}
