//! Month and size rotation of the active log file
//!
//! The active file is always `<stem>.md`. When it rolls over it is renamed to
//! an archive name and never appended to again:
//! - month rollover: `<stem>.<yyyy-MM>.md`, at most one per month
//! - size rollover: `<stem>_archived_<yyyyMMdd_HHmmss>.md`, with `_<n>`
//!   appended for further rollovers in the same second

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::clock::Month;
use crate::error::{LogError, LogResult};
use crate::markdown;

const EXTENSION: &str = "md";
const SIZE_ARCHIVE_MARKER: &str = "_archived_";

/// Path of the active log file for a script
pub fn active_path(log_dir: &Path, stem: &str) -> PathBuf {
    log_dir.join(format!("{}.{}", stem, EXTENSION))
}

/// Path a file last written in `month` is archived to
pub fn month_archive_path(log_dir: &Path, stem: &str, month: Month) -> PathBuf {
    log_dir.join(format!("{}.{}.{}", stem, month.stamp(), EXTENSION))
}

/// First free timestamped archive path for a size rollover at `now`
pub fn size_archive_path(log_dir: &Path, stem: &str, now: &DateTime<Local>) -> PathBuf {
    timestamped_archive_path(log_dir, stem, EXTENSION, now)
}

/// Next `<stem>_archived_<yyyyMMdd_HHmmss>[_<n>].<extension>` path in `dir`
///
/// The counter continues after the highest one already used for that second,
/// so a later archive never takes the name of a deleted earlier one.
pub(crate) fn timestamped_archive_path(
    dir: &Path,
    stem: &str,
    extension: &str,
    now: &DateTime<Local>,
) -> PathBuf {
    let base = format!("{}{}{}", stem, SIZE_ARCHIVE_MARKER, now.format("%Y%m%d_%H%M%S"));
    let suffix = format!(".{}", extension);

    // The bare name counts as 1
    let highest = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let rest = name.strip_prefix(&base)?.strip_suffix(&suffix)?;
            if rest.is_empty() {
                Some(1)
            } else {
                rest.strip_prefix('_')?.parse::<u32>().ok()
            }
        })
        .max();

    match highest {
        None => dir.join(format!("{}{}", base, suffix)),
        Some(n) => dir.join(format!("{}_{}{}", base, n + 1, suffix)),
    }
}

/// Result of checking the active file against the rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationCheck {
    /// No active file exists
    Missing,
    /// The file can be appended to
    Current,
    /// The file was last written in an earlier (or otherwise different) month
    MonthChanged { last_written: Month },
    /// The file is larger than the threshold
    SizeExceeded { size: u64 },
}

/// Decide whether the active file must be rotated
///
/// The month check wins over the size check.
pub fn check(path: &Path, now: &DateTime<Local>, max_size_bytes: u64) -> LogResult<RotationCheck> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RotationCheck::Missing),
        Err(source) => {
            return Err(LogError::Metadata {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let modified = metadata.modified().map_err(|source| LogError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    let last_written = Month::of_system_time(modified);
    if last_written != Month::of(now) {
        return Ok(RotationCheck::MonthChanged { last_written });
    }

    if metadata.len() > max_size_bytes {
        return Ok(RotationCheck::SizeExceeded {
            size: metadata.len(),
        });
    }

    Ok(RotationCheck::Current)
}

/// What happened to a file from a previous month
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthArchive {
    /// Renamed to the month archive
    Archived(PathBuf),
    /// An archive for that month already existed; the stale file was deleted
    DiscardedStale(PathBuf),
}

impl MonthArchive {
    pub fn archive_path(&self) -> &Path {
        match self {
            MonthArchive::Archived(p) | MonthArchive::DiscardedStale(p) => p,
        }
    }
}

/// Archive a file last written in `last_written` under its month name
pub fn archive_month(
    active: &Path,
    log_dir: &Path,
    stem: &str,
    last_written: Month,
) -> LogResult<MonthArchive> {
    let archive = month_archive_path(log_dir, stem, last_written);
    if archive.exists() {
        fs::remove_file(active).map_err(|source| LogError::Rotate {
            from: active.to_path_buf(),
            to: archive.clone(),
            source,
        })?;
        tracing::debug!(
            "Month archive {} already exists, discarded {}",
            archive.display(),
            active.display()
        );
        return Ok(MonthArchive::DiscardedStale(archive));
    }

    rename(active, &archive)?;
    tracing::debug!("Archived {} as {}", active.display(), archive.display());
    Ok(MonthArchive::Archived(archive))
}

/// Archive an oversized file under a timestamped name
pub fn archive_size(
    active: &Path,
    log_dir: &Path,
    stem: &str,
    now: &DateTime<Local>,
) -> LogResult<PathBuf> {
    let archive = size_archive_path(log_dir, stem, now);
    rename(active, &archive)?;
    tracing::debug!("Archived {} as {}", active.display(), archive.display());
    Ok(archive)
}

fn rename(from: &Path, to: &Path) -> LogResult<()> {
    fs::rename(from, to).map_err(|source| LogError::Rotate {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Whether `file_name` is an archive of the script with this stem
///
/// This only looks at the name. A script whose own name looks like an
/// archive of another (`Demo.2026-09` next to `Demo`) produces an active
/// file with an archive-shaped name; [`list_archives`] tells those apart by
/// their header.
pub fn is_archive_name(file_name: &str, stem: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix(stem)
        .and_then(|r| r.strip_suffix(&format!(".{}", EXTENSION)))
    else {
        return false;
    };

    match rest.strip_prefix('.') {
        Some(stamp) => is_month_stamp(stamp),
        None => is_timestamped_archive_name(file_name, stem, EXTENSION),
    }
}

/// Whether `file_name` is `<stem>_archived_<yyyyMMdd_HHmmss>[_<n>].<extension>`
pub(crate) fn is_timestamped_archive_name(file_name: &str, stem: &str, extension: &str) -> bool {
    let Some(stamp) = file_name
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix(SIZE_ARCHIVE_MARKER))
        .and_then(|r| r.strip_suffix(extension))
        .and_then(|r| r.strip_suffix('.'))
    else {
        return false;
    };

    // yyyyMMdd_HHmmss, optionally followed by _<n>
    let (ts, counter) = match stamp.get(15..) {
        Some("") => (stamp, None),
        Some(tail) => (&stamp[..15], tail.strip_prefix('_')),
        None => return false,
    };
    let ts_ok = ts.len() == 15
        && ts
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 8 { b == b'_' } else { b.is_ascii_digit() });
    let counter_ok = match counter {
        None => stamp.len() == 15,
        Some(n) => !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()),
    };
    ts_ok && counter_ok
}

/// yyyy-MM
fn is_month_stamp(stamp: &str) -> bool {
    let bytes = stamp.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
}

/// Whether `path` is the active log of a script named after its file stem
fn is_active_log_of_own_name(path: &Path) -> bool {
    let Some(name) = path.file_stem().and_then(|n| n.to_str()) else {
        return false;
    };
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let mut first_line = String::new();
    if BufReader::new(file).read_line(&mut first_line).is_err() {
        return false;
    }
    first_line.trim_end() == markdown::title(name)
}

/// List archives for a script, sorted by file name
///
/// Archive-shaped files whose header names them as their own script's
/// active log are left out.
pub fn list_archives(log_dir: &Path, stem: &str) -> LogResult<Vec<PathBuf>> {
    let mut archives = list_matching(log_dir, |name| is_archive_name(name, stem))?;
    archives.retain(|path| !is_active_log_of_own_name(path));
    Ok(archives)
}

/// Files in `dir` whose name passes `matches`, sorted by name
pub(crate) fn list_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> LogResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let read_err = |source| LogError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if matches(name) && path.is_file() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::local;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str, modified: SystemTime) {
        fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn test_paths() {
        let dir = Path::new("/logs");
        assert_eq!(active_path(dir, "Demo"), PathBuf::from("/logs/Demo.md"));
        let month = Month { year: 2026, month: 9 };
        assert_eq!(
            month_archive_path(dir, "Demo", month),
            PathBuf::from("/logs/Demo.2026-09.md")
        );
    }

    #[test]
    fn test_size_archive_path_is_unique() {
        let temp_dir = TempDir::new().unwrap();
        let now = local(2026, 10, 18, 14, 30, 45);

        let first = size_archive_path(temp_dir.path(), "Demo", &now);
        assert!(first.ends_with("Demo_archived_20261018_143045.md"));
        fs::write(&first, "x").unwrap();

        let second = size_archive_path(temp_dir.path(), "Demo", &now);
        assert!(second.ends_with("Demo_archived_20261018_143045_2.md"));
        fs::write(&second, "x").unwrap();

        // A deleted earlier name is not reused
        fs::remove_file(&first).unwrap();
        let third = size_archive_path(temp_dir.path(), "Demo", &now);
        assert!(third.ends_with("Demo_archived_20261018_143045_3.md"));
    }

    #[test]
    fn test_check_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Demo.md");
        let now = local(2026, 10, 18, 12, 0, 0);
        assert_eq!(check(&path, &now, 100).unwrap(), RotationCheck::Missing);
    }

    #[test]
    fn test_check_month_changed_wins_over_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Demo.md");
        touch(&path, "0123456789", local(2026, 9, 30, 23, 0, 0).into());

        let now = local(2026, 10, 1, 0, 30, 0);
        assert_eq!(
            check(&path, &now, 1).unwrap(),
            RotationCheck::MonthChanged {
                last_written: Month { year: 2026, month: 9 }
            }
        );
    }

    #[test]
    fn test_check_size_exceeded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Demo.md");
        let now = local(2026, 10, 18, 12, 0, 0);
        touch(&path, "0123456789", now.into());

        assert_eq!(check(&path, &now, 10).unwrap(), RotationCheck::Current);
        assert_eq!(
            check(&path, &now, 9).unwrap(),
            RotationCheck::SizeExceeded { size: 10 }
        );
    }

    #[test]
    fn test_archive_month_renames() {
        let temp_dir = TempDir::new().unwrap();
        let active = active_path(temp_dir.path(), "Demo");
        fs::write(&active, "old rows").unwrap();

        let month = Month { year: 2026, month: 9 };
        let outcome = archive_month(&active, temp_dir.path(), "Demo", month).unwrap();

        let archive = temp_dir.path().join("Demo.2026-09.md");
        assert_eq!(outcome, MonthArchive::Archived(archive.clone()));
        assert!(!active.exists());
        assert_eq!(fs::read_to_string(archive).unwrap(), "old rows");
    }

    #[test]
    fn test_archive_month_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let active = active_path(temp_dir.path(), "Demo");
        let archive = temp_dir.path().join("Demo.2026-09.md");
        fs::write(&active, "stale").unwrap();
        fs::write(&archive, "original archive").unwrap();

        let month = Month { year: 2026, month: 9 };
        let outcome = archive_month(&active, temp_dir.path(), "Demo", month).unwrap();

        assert_eq!(outcome, MonthArchive::DiscardedStale(archive.clone()));
        assert!(!active.exists());
        assert_eq!(fs::read_to_string(archive).unwrap(), "original archive");
    }

    #[test]
    fn test_is_archive_name() {
        assert!(is_archive_name("Demo.2026-09.md", "Demo"));
        assert!(is_archive_name("Demo_archived_20261018_143045.md", "Demo"));
        assert!(is_archive_name("Demo_archived_20261018_143045_3.md", "Demo"));

        assert!(!is_archive_name("Demo.md", "Demo"));
        assert!(!is_archive_name("Demo.2026-9.md", "Demo"));
        assert!(!is_archive_name("Other.2026-09.md", "Demo"));
        assert!(!is_archive_name("Demo_archived_2026.md", "Demo"));
        assert!(!is_archive_name("Demo_archived_20261018_143045_.md", "Demo"));
        assert!(!is_archive_name("events.jsonl", "Demo"));
    }

    #[test]
    fn test_list_archives_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in [
            "Demo.md",
            "Demo.2026-09.md",
            "Demo.2026-08.md",
            "Demo_archived_20261018_143045.md",
            "Other.2026-09.md",
        ] {
            fs::write(temp_dir.path().join(name), "x").unwrap();
        }

        let archives = list_archives(temp_dir.path(), "Demo").unwrap();
        let names: Vec<String> = archives
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "Demo.2026-08.md",
                "Demo.2026-09.md",
                "Demo_archived_20261018_143045.md"
            ]
        );
    }

    #[test]
    fn test_list_archives_skips_active_log_of_lookalike_script() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("Demo.2026-08.md");
        let lookalike = temp_dir.path().join("Demo.2026-09.md");
        fs::write(&archive, format!("{}\n\nold rows\n", markdown::title("Demo"))).unwrap();
        fs::write(&lookalike, format!("{}\n\nlive rows\n", markdown::title("Demo.2026-09"))).unwrap();

        assert!(is_archive_name("Demo.2026-09.md", "Demo"));
        assert_eq!(list_archives(temp_dir.path(), "Demo").unwrap(), vec![archive]);
    }

    #[test]
    fn test_timestamped_archive_name_with_other_extension() {
        assert!(is_timestamped_archive_name(
            "events_archived_20261018_143045.jsonl",
            "events",
            "jsonl"
        ));
        assert!(is_timestamped_archive_name(
            "events_archived_20261018_143045_2.jsonl",
            "events",
            "jsonl"
        ));
        assert!(!is_timestamped_archive_name("events.jsonl", "events", "jsonl"));
        assert!(!is_timestamped_archive_name(
            "events_archived_20261018_143045.md",
            "events",
            "jsonl"
        ));
    }

    #[test]
    fn test_list_archives_missing_dir() {
        let archives = list_archives(Path::new("/nonexistent/path/for/testing"), "Demo").unwrap();
        assert!(archives.is_empty());
    }
}
