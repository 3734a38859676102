//! Configuration management for mdlog

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::console::Console;
use crate::event_sink::{EventSink, JournalSink, TracingSink};
use crate::writer::{Logger, LoggerBuilder, DEFAULT_MAX_SIZE_BYTES};

/// Which event sink a logger mirrors to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    /// JSON-lines journal in the log directory
    Journal,
    /// `tracing` events on target `mdlog::event`
    Tracing,
    /// No event sink
    None,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for log files and archives; `~` is expanded
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Rotate once the active file is larger than this (default: 10 MiB)
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Echo each row to the console
    #[serde(default = "default_true")]
    pub console_echo: bool,

    /// Use ANSI colours for the console echo
    #[serde(default = "default_true")]
    pub console_color: bool,

    #[serde(default = "default_event_sink")]
    pub event_sink: EventSinkKind,

    /// Event source name; defaults to the script name
    #[serde(default)]
    pub event_source: Option<String>,

    /// Delete archives older than this many days whenever a logger is
    /// initialized (default: keep forever)
    #[serde(default)]
    pub archive_retention_days: Option<u64>,
}

fn default_log_dir() -> String {
    logs_dir().to_string_lossy().into_owned()
}

fn default_max_size_bytes() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_true() -> bool {
    true
}

fn default_event_sink() -> EventSinkKind {
    EventSinkKind::Journal
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            max_size_bytes: default_max_size_bytes(),
            console_echo: true,
            console_color: true,
            event_sink: default_event_sink(),
            event_source: None,
            archive_retention_days: None,
        }
    }
}

impl Config {
    /// Load configuration from the default file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or return defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// The log directory with `~` expanded
    pub fn resolved_log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned())
    }

    fn event_sink_for(&self, log_dir: &Path) -> Option<Box<dyn EventSink>> {
        match self.event_sink {
            EventSinkKind::Journal => Some(Box::new(JournalSink::in_dir(log_dir))),
            EventSinkKind::Tracing => Some(Box::new(TracingSink::new())),
            EventSinkKind::None => None,
        }
    }

    /// A logger builder carrying these settings
    pub fn logger(&self, script_name: &str, script_version: &str) -> LoggerBuilder {
        let log_dir = self.resolved_log_dir();
        let console = self.console_echo.then_some(Console {
            color: self.console_color,
        });

        let mut builder = Logger::builder(script_name, script_version)
            .boxed_event_sink(self.event_sink_for(&log_dir))
            .log_dir(log_dir)
            .max_size_bytes(self.max_size_bytes)
            .console(console);
        if let Some(source) = &self.event_source {
            builder = builder.event_source(source.clone());
        }
        if let Some(days) = self.archive_retention_days {
            builder = builder.archive_retention_days(days);
        }
        builder
    }
}

/// Get the base configuration directory (~/.mdlog)
/// Falls back to ./.mdlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".mdlog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".mdlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the default logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}
