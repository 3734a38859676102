//! Sink that forwards entries to `tracing`

use super::{EventEntry, EventSink, SinkError};
use crate::level::Severity;

/// Emits each entry as a `tracing` event on target `mdlog::event`
#[derive(Debug, Default)]
pub struct TracingSink {
    source: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for TracingSink {
    fn register_source(&mut self, source: &str) -> Result<(), SinkError> {
        tracing::debug!(target: "mdlog::event", source, "event source registered");
        self.source = Some(source.to_string());
        Ok(())
    }

    fn write_entry(&mut self, entry: &EventEntry) -> Result<(), SinkError> {
        if self.source.is_none() {
            return Err(SinkError::NotRegistered);
        }
        let source = entry.source.as_str();
        let event_id = entry.event_id;
        let message = entry.message.as_str();
        match entry.severity {
            Severity::Information => {
                tracing::info!(target: "mdlog::event", source, event_id, "{}", message)
            }
            Severity::Warning => {
                tracing::warn!(target: "mdlog::event", source, event_id, "{}", message)
            }
            Severity::Error => {
                tracing::error!(target: "mdlog::event", source, event_id, "{}", message)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::local;

    #[test]
    fn test_requires_registration() {
        let mut sink = TracingSink::new();
        let entry = EventEntry {
            timestamp: local(2026, 1, 1, 0, 0, 0),
            source: "Demo".to_string(),
            event_id: 1000,
            severity: Severity::Information,
            message: "hello".to_string(),
        };
        assert!(sink.write_entry(&entry).is_err());
        sink.register_source("Demo").unwrap();
        assert!(sink.write_entry(&entry).is_ok());
    }
}
