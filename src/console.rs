//! Coloured console echo of log rows

use std::io::{self, Write};

use chrono::{DateTime, Local};
use crossterm::style::{style, Stylize};

use crate::level::Level;
use crate::markdown::TIMESTAMP_FORMAT;

/// Where and how rows are echoed to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    /// Emit ANSI colour codes
    pub color: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Console {
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Render one echo line (without trailing newline)
    pub fn render(&self, timestamp: &DateTime<Local>, level: Level, message: &str) -> String {
        let line = format!(
            "[{}] [{}] {}",
            timestamp.format(TIMESTAMP_FORMAT),
            level.as_str(),
            message
        );
        if self.color {
            style(line).with(level.color()).to_string()
        } else {
            line
        }
    }

    pub fn echo_to<W: Write>(
        &self,
        out: &mut W,
        timestamp: &DateTime<Local>,
        level: Level,
        message: &str,
    ) -> io::Result<()> {
        writeln!(out, "{}", self.render(timestamp, level, message))
    }

    /// Echo to stdout; failures are ignored
    pub fn echo(&self, timestamp: &DateTime<Local>, level: Level, message: &str) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let _ = self.echo_to(&mut lock, timestamp, level, message);
    }
}
