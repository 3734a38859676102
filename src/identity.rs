//! Identity of the script and machine a log belongs to

use std::path::PathBuf;

/// Who is logging: script identity plus host and user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub script_name: String,
    pub script_version: String,
    pub computer: String,
    pub user: String,
}

impl Identity {
    /// Identity for a script, with host and user detected from the environment
    pub fn detect(script_name: impl Into<String>, script_version: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            script_version: script_version.into(),
            computer: computer_name(),
            user: user_name(),
        }
    }

    /// File stem for this script's logs
    ///
    /// Characters that are not valid in file names on common platforms are
    /// replaced with `_`.
    pub fn file_stem(&self) -> String {
        file_stem(&self.script_name)
    }
}

/// Sanitize a script name into a file stem
pub fn file_stem(script_name: &str) -> String {
    let stem: String = script_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "script".to_string()
    } else {
        stem
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Host name from the environment, `/etc/hostname`, or `unknown`
pub fn computer_name() -> String {
    non_empty_var("COMPUTERNAME")
        .or_else(|| non_empty_var("HOSTNAME"))
        .or_else(|| {
            std::fs::read_to_string(PathBuf::from("/etc/hostname"))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Current user from the environment, or `unknown`
pub fn user_name() -> String {
    non_empty_var("USERNAME")
        .or_else(|| non_empty_var("USER"))
        .unwrap_or_else(|| "unknown".to_string())
}
