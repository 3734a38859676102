//! Log levels and their per-sink representations

use std::fmt;
use std::str::FromStr;

use crossterm::style::Color;
use serde::{Deserialize, Serialize};

/// Level of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// Severity attached to entries sent to an event sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl Level {
    /// All levels, in ascending severity
    pub const ALL: [Level; 4] = [Level::Info, Level::Success, Level::Warning, Level::Error];

    /// Upper-case name used in console output and event messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    /// Tag written in the Level column of the markdown table
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Success => "[OK]",
            Level::Warning => "[WARN]",
            Level::Error => "[ERROR]",
        }
    }

    /// Reverse of [`Level::tag`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Level::ALL.into_iter().find(|l| l.tag() == tag)
    }

    /// Console colour for this level
    pub fn color(&self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Success => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Level::Info | Level::Success => Severity::Information,
            Level::Warning => Severity::Warning,
            Level::Error => Severity::Error,
        }
    }

    /// Event ID band: 1000s informational, 2000s warnings, 3000s errors
    pub fn event_id(&self) -> u32 {
        match self {
            Level::Info => 1000,
            Level::Success => 1001,
            Level::Warning => 2000,
            Level::Error => 3000,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}' (expected info, success, warning or error)")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Level::Info),
            "success" | "ok" => Ok(Level::Success),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        assert_eq!(Level::Info.tag(), "[INFO]");
        assert_eq!(Level::Success.tag(), "[OK]");
        assert_eq!(Level::Warning.tag(), "[WARN]");
        assert_eq!(Level::Error.tag(), "[ERROR]");
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(Level::from_tag("[OK]"), Some(Level::Success));
        assert_eq!(Level::from_tag("[WARN]"), Some(Level::Warning));
        assert_eq!(Level::from_tag("[SUCCESS]"), None);
    }

    #[test]
    fn test_event_id_bands() {
        assert_eq!(Level::Info.event_id(), 1000);
        assert_eq!(Level::Success.event_id(), 1001);
        assert_eq!(Level::Warning.event_id(), 2000);
        assert_eq!(Level::Error.event_id(), 3000);
    }

    #[test]
    fn test_severity() {
        assert_eq!(Level::Success.severity(), Severity::Information);
        assert_eq!(Level::Warning.severity(), Severity::Warning);
        assert_eq!(Level::Error.severity(), Severity::Error);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("ok".parse::<Level>().unwrap(), Level::Success);
        assert_eq!("Warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" error ".parse::<Level>().unwrap(), Level::Error);
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn test_colors() {
        assert_eq!(Level::Info.color(), Color::Cyan);
        assert_eq!(Level::Success.color(), Color::Green);
        assert_eq!(Level::Warning.color(), Color::Yellow);
        assert_eq!(Level::Error.color(), Color::Red);
    }
}
