//! Log file retention management
//!
//! One sweep walks the log directory and, for every file no writer holds open,
//! compresses files more than [`COMPRESS_AFTER_DAYS`] days old and deletes files
//! more than [`DELETE_AFTER_DAYS`] days old.

use std::fs::{self, DirEntry, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use flate2::{Compression, GzBuilder};

use super::registry::ActiveFiles;
use crate::clock::Clock;
use crate::config::{ARCHIVE_SUFFIX, COMPRESS_AFTER_DAYS, DELETE_AFTER_DAYS};
use crate::error::LogError;

/// What a sweep does with one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Keep,
    Compress,
    Remove,
}

/// Decide the action for a file of the given age in days
pub fn classify(age_days: i64, file_name: &str) -> SweepAction {
    if age_days > DELETE_AFTER_DAYS {
        SweepAction::Remove
    } else if age_days > COMPRESS_AFTER_DAYS && !is_archive(file_name) {
        SweepAction::Compress
    } else {
        SweepAction::Keep
    }
}

/// Check whether a file name is an archive produced by a sweep
pub fn is_archive(file_name: &str) -> bool {
    file_name.ends_with(ARCHIVE_SUFFIX)
}

/// Whole calendar days between a file's modification date and `today`
pub fn age_in_days(today: NaiveDate, modified: DateTime<Local>) -> i64 {
    (today - modified.date_naive()).num_days()
}

/// Outcome of one sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Archives created, one per compressed file
    pub compressed: Vec<PathBuf>,
    /// Files deleted outright
    pub removed: Vec<PathBuf>,
    /// Active files that were skipped
    pub skipped_active: Vec<PathBuf>,
    /// Failures; none of them stopped the sweep
    pub errors: Vec<LogError>,
}

impl SweepReport {
    /// True if the sweep changed nothing and hit no errors
    pub fn is_empty(&self) -> bool {
        self.compressed.is_empty() && self.removed.is_empty() && self.errors.is_empty()
    }
}

/// Run one retention pass over `dir`
///
/// Errors are collected into the report; the sweep always visits every entry.
pub fn sweep(dir: &Path, active: &ActiveFiles, clock: &dyn Clock) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) => {
            report.errors.push(LogError::DirectoryRead {
                path: dir.to_path_buf(),
                source,
            });
            return report;
        }
    };

    let today = clock.now().date_naive();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                report.errors.push(LogError::DirectoryRead {
                    path: dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        sweep_entry(&entry, today, active, &mut report);
    }

    report
}

fn sweep_entry(
    entry: &DirEntry,
    today: NaiveDate,
    active: &ActiveFiles,
    report: &mut SweepReport,
) {
    let path = entry.path();

    // Only regular files; stat failures mean the file vanished or is unreadable
    let modified = match entry.metadata() {
        Ok(metadata) if metadata.is_file() => match metadata.modified() {
            Ok(modified) => DateTime::<Local>::from(modified),
            Err(_) => return,
        },
        _ => return,
    };

    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };

    // Held until the file is handled so a writer cannot adopt it mid-sweep
    let registry = active.lock();
    if registry.contains(&path) {
        report.skipped_active.push(path);
        return;
    }

    match classify(age_in_days(today, modified), &name) {
        SweepAction::Keep => {}
        SweepAction::Remove => match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(source) => report.errors.push(LogError::FileRemove { path, source }),
        },
        SweepAction::Compress => match compress_and_remove(&path) {
            Ok(archive) => report.compressed.push(archive),
            Err(err) => report.errors.push(err),
        },
    }

    drop(registry);
}

/// Gzip `path` into `<path>.gz` at maximum compression
///
/// The original file name is stored in the gzip header. On failure the
/// partial archive is removed.
pub fn compress(path: &Path) -> Result<PathBuf, LogError> {
    let mut archive_name = path.as_os_str().to_owned();
    archive_name.push(ARCHIVE_SUFFIX);
    let archive = PathBuf::from(archive_name);

    let result = write_archive(path, &archive);
    if result.is_err() {
        let _ = fs::remove_file(&archive);
    }
    result
        .map(|()| archive)
        .map_err(|source| LogError::Compression {
            path: path.to_path_buf(),
            source,
        })
}

fn write_archive(source: &Path, archive: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let output = File::create(archive)?;

    let header_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut encoder = GzBuilder::new()
        .filename(header_name)
        .write(output, Compression::best());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()
}

/// Compress `path`, then delete the original
pub fn compress_and_remove(path: &Path) -> Result<PathBuf, LogError> {
    let archive = compress(path)?;
    fs::remove_file(path).map_err(|source| LogError::FileRemove {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(archive)
}
