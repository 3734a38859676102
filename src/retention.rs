//! Archive retention management
//!
//! Deletes archived logs older than a retention period. The active file is
//! never touched.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::LogResult;
use crate::rotation::list_archives;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Delete archives of `stem` last written more than `retention_days` ago
///
/// Returns the number of files deleted.
pub fn cleanup_old_archives(log_dir: &Path, stem: &str, retention_days: u64) -> LogResult<usize> {
    cleanup_old_archives_at(log_dir, stem, retention_days, SystemTime::now())
}

pub(crate) fn cleanup_old_archives_at(
    log_dir: &Path,
    stem: &str,
    retention_days: u64,
    now: SystemTime,
) -> LogResult<usize> {
    // A period too long to represent keeps everything
    let Some(retention_secs) = retention_days.checked_mul(SECS_PER_DAY) else {
        tracing::debug!("Retention of {} days keeps every archive", retention_days);
        return Ok(0);
    };
    let cutoff = now
        .checked_sub(Duration::from_secs(retention_secs))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;
    for path in list_archives(log_dir, stem)? {
        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if modified < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => deleted_count += 1,
                Err(e) => tracing::warn!("Could not delete old archive {}: {}", path.display(), e),
            }
        }
    }

    if deleted_count > 0 {
        tracing::debug!("Deleted {} archives older than {} days", deleted_count, retention_days);
    }
    Ok(deleted_count)
}
