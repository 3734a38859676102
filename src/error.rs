//! Error types for the log writer
//!
//! Internal steps return these; the public write path turns them into
//! diagnostics instead of propagating them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single log-writer step
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to create log directory {}: {}", .path.display(), friendly(.source))]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to create log file {}: {}", .path.display(), friendly(.source))]
    CreateFile { path: PathBuf, source: io::Error },

    #[error("failed to append to {}: {}", .path.display(), friendly(.source))]
    Append { path: PathBuf, source: io::Error },

    #[error("failed to archive {} as {}: {}", .from.display(), .to.display(), friendly(.source))]
    Rotate {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to read metadata of {}: {}", .path.display(), friendly(.source))]
    Metadata { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {}", .path.display(), friendly(.source))]
    Read { path: PathBuf, source: io::Error },

    #[error("logger is not initialized")]
    Uninitialized,
}

impl LogError {
    /// The underlying I/O error, if any
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            LogError::CreateDir { source, .. }
            | LogError::CreateFile { source, .. }
            | LogError::Append { source, .. }
            | LogError::Rotate { source, .. }
            | LogError::Metadata { source, .. }
            | LogError::Read { source, .. } => Some(source),
            LogError::Uninitialized => None,
        }
    }

    pub fn disk_error_kind(&self) -> Option<DiskErrorKind> {
        self.io_error().map(categorize_io_error)
    }
}

pub type LogResult<T> = Result<T, LogError>;

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            if let Some(os_error) = e.raw_os_error() {
                // ENOSPC = 28, EDQUOT = 122 (Linux) / 69 (macOS),
                // ERROR_DISK_FULL = 112 and ERROR_HANDLE_DISK_FULL = 39 on Windows
                #[cfg(unix)]
                if os_error == 28 || os_error == 122 || os_error == 69 {
                    return DiskErrorKind::DiskFull;
                }
                #[cfg(windows)]
                if os_error == 112 || os_error == 39 {
                    return DiskErrorKind::DiskFull;
                }
                #[cfg(unix)]
                if os_error == 13 {
                    return DiskErrorKind::PermissionDenied;
                }
            }
            DiskErrorKind::Other
        }
    }
}

fn friendly(e: &io::Error) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => e.to_string(),
        kind => kind.user_message().to_string(),
    }
}
