//! Daily-rotating log file writer
//!
//! Each stream writes to `<dir>/<stream>.<YYYY-MM-DD>.log`. Every write checks
//! the calendar date against the open file's date and rotates when it changes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing_subscriber::fmt::MakeWriter;

use super::registry::ActiveFiles;
use crate::clock::Clock;
use crate::error::LogError;

/// Build the file name for a stream on a given day
pub fn log_file_name(stream: &str, day: NaiveDate) -> String {
    format!("{}.{}.log", stream, day.format("%Y-%m-%d"))
}

/// Currently open file and the day it belongs to
struct OpenFile {
    day: NaiveDate,
    path: PathBuf,
    file: File,
}

/// Append-only writer for one stream that switches files at midnight
pub struct RotatingFileWriter {
    stream: String,
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    active: Arc<ActiveFiles>,
    state: Mutex<Option<OpenFile>>,
}

impl RotatingFileWriter {
    /// Create a writer for `stream` inside `dir`
    ///
    /// No file is opened until the first write.
    pub fn new(
        stream: impl Into<String>,
        dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        active: Arc<ActiveFiles>,
    ) -> Self {
        Self {
            stream: stream.into(),
            dir: dir.into(),
            clock,
            active,
            state: Mutex::new(None),
        }
    }

    /// Logical stream name
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Directory this writer creates files in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file currently open, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock_state().as_ref().map(|open| open.path.clone())
    }

    /// Append `buf` to today's file, rotating first if the day changed
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock_state();
        let file = self.rotate_if_needed(&mut state).map_err(LogError::into_io)?;
        file.write(buf)
    }

    /// Append all of `buf` to today's file
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.lock_state();
        let file = self.rotate_if_needed(&mut state).map_err(LogError::into_io)?;
        file.write_all(buf)
    }

    /// Flush the open file, if any
    pub fn flush(&self) -> io::Result<()> {
        match self.lock_state().as_mut() {
            Some(open) => open.file.flush(),
            None => Ok(()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<OpenFile>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rotate_if_needed<'s>(
        &self,
        state: &'s mut Option<OpenFile>,
    ) -> Result<&'s mut File, LogError> {
        let today = self.clock.now().date_naive();

        // On a failed open the slot stays empty and the next write retries
        let open = match state.take() {
            Some(open) if open.day == today => open,
            previous => self.rotate(previous, today)?,
        };
        Ok(&mut state.insert(open).file)
    }

    // Runs under the state lock: no tracing events here, this writer may back
    // the tracing subscriber itself.
    fn rotate(&self, previous: Option<OpenFile>, today: NaiveDate) -> Result<OpenFile, LogError> {
        let path = self.dir.join(log_file_name(&self.stream, today));
        let mut active = self.active.lock();

        // Close the previous day's handle before opening the next one
        if let Some(old) = previous {
            active.remove(&old.path);
            drop(old);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::RotationFailed {
                path: path.clone(),
                source,
            })?;

        active.replace(None, path.clone());

        Ok(OpenFile {
            day: today,
            path,
            file,
        })
    }
}

/// Writer handed out per tracing event
pub struct StreamWriter {
    inner: Arc<RotatingFileWriter>,
}

impl Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writer factory for tracing-subscriber
#[derive(Clone)]
pub struct StreamMakeWriter {
    inner: Arc<RotatingFileWriter>,
}

impl StreamMakeWriter {
    /// Route tracing output into `writer`
    pub fn new(writer: Arc<RotatingFileWriter>) -> Self {
        Self { inner: writer }
    }
}

impl<'a> MakeWriter<'a> for StreamMakeWriter {
    type Writer = StreamWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StreamWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, Local, TimeZone};
    use tempfile::TempDir;

    fn writer_at(
        dir: &Path,
        start: chrono::DateTime<Local>,
    ) -> (RotatingFileWriter, Arc<ManualClock>, Arc<ActiveFiles>) {
        let clock = Arc::new(ManualClock::new(start));
        let active = Arc::new(ActiveFiles::new());
        let writer = RotatingFileWriter::new("app-access", dir, clock.clone(), active.clone());
        (writer, clock, active)
    }

    #[test]
    fn test_log_file_name() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(log_file_name("app-error", day), "app-error.2026-01-09.log");
    }

    #[test]
    fn test_no_file_before_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let (writer, _clock, active) = writer_at(temp_dir.path(), start);

        assert!(writer.current_path().is_none());
        assert!(active.snapshot().is_empty());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_same_day_writes_share_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let (writer, clock, active) = writer_at(temp_dir.path(), start);

        writer.write_all(b"first\n").unwrap();
        let path = writer.current_path().unwrap();
        clock.advance(Duration::hours(10));
        writer.write_all(b"second\n").unwrap();

        assert_eq!(writer.current_path().unwrap(), path);
        assert_eq!(path, temp_dir.path().join("app-access.2026-03-10.log"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert_eq!(active.snapshot(), vec![path]);
    }

    #[test]
    fn test_rotates_once_on_day_change() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap();
        let (writer, clock, active) = writer_at(temp_dir.path(), start);

        writer.write_all(b"before midnight\n").unwrap();
        let old_path = writer.current_path().unwrap();

        clock.advance(Duration::hours(2));
        writer.write_all(b"after midnight\n").unwrap();
        writer.write_all(b"later\n").unwrap();
        let new_path = writer.current_path().unwrap();

        assert_ne!(old_path, new_path);
        assert_eq!(new_path, temp_dir.path().join("app-access.2026-03-11.log"));
        assert_eq!(
            std::fs::read_to_string(&old_path).unwrap(),
            "before midnight\n"
        );
        assert_eq!(
            std::fs::read_to_string(&new_path).unwrap(),
            "after midnight\nlater\n"
        );
        assert_eq!(active.snapshot(), vec![new_path]);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_rotates_across_year_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();
        let (writer, clock, _active) = writer_at(temp_dir.path(), start);

        writer.write_all(b"old year\n").unwrap();
        clock.set(Local.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        writer.write_all(b"new year\n").unwrap();

        assert_eq!(
            writer.current_path().unwrap(),
            temp_dir.path().join("app-access.2026-01-01.log")
        );
    }

    #[test]
    fn test_rotates_on_same_day_of_year_in_next_year() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        let (writer, clock, _active) = writer_at(temp_dir.path(), start);

        writer.write_all(b"a\n").unwrap();
        clock.set(Local.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap());
        writer.write_all(b"b\n").unwrap();

        let path = writer.current_path().unwrap();
        assert_eq!(path, temp_dir.path().join("app-access.2026-01-05.log"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "b\n");
    }

    #[test]
    fn test_reopens_existing_file_in_append_mode() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let existing = temp_dir.path().join("app-access.2026-03-10.log");
        std::fs::write(&existing, "from earlier run\n").unwrap();

        let (writer, _clock, _active) = writer_at(temp_dir.path(), start);
        writer.write_all(b"from this run\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&existing).unwrap(),
            "from earlier run\nfrom this run\n"
        );
    }

    #[test]
    fn test_open_failure_is_rotation_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        let start = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let (writer, _clock, active) = writer_at(&missing, start);

        let err = writer.write(b"lost\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<LogError>())
            .unwrap();
        assert!(matches!(inner, LogError::RotationFailed { .. }));
        assert!(writer.current_path().is_none());
        assert!(active.snapshot().is_empty());

        // Next write retries the open
        std::fs::create_dir_all(&missing).unwrap();
        writer.write_all(b"kept\n").unwrap();
        assert!(writer.current_path().is_some());
    }

    #[test]
    fn test_make_writer() {
        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let (writer, _clock, _active) = writer_at(temp_dir.path(), start);
        let writer = Arc::new(writer);

        let maker = StreamMakeWriter::new(Arc::clone(&writer));
        let mut handle = maker.make_writer();
        handle.write_all(b"via tracing\n").unwrap();
        handle.flush().unwrap();

        let path = writer.current_path().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "via tracing\n");
    }

    #[test]
    fn test_concurrent_writes_across_midnight() {
        const THREADS: usize = 8;
        const LINES_PER_DAY: usize = 250;

        let temp_dir = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 10, 23, 59, 59).unwrap();
        let (writer, clock, active) = writer_at(temp_dir.path(), start);
        let writer = Arc::new(writer);
        let barrier = Arc::new(std::sync::Barrier::new(THREADS + 1));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let writer = Arc::clone(&writer);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    for day in 0..2 {
                        for n in 0..LINES_PER_DAY {
                            let line = format!("thread {:02} day {} line {:04}\n", t, day, n);
                            writer.write_all(line.as_bytes()).unwrap();
                        }
                        // Everyone finishes day 0 before the clock moves
                        barrier.wait();
                        barrier.wait();
                    }
                })
            })
            .collect();

        barrier.wait();
        clock.advance(Duration::seconds(2));
        barrier.wait();
        barrier.wait();
        barrier.wait();
        for handle in handles {
            handle.join().unwrap();
        }

        for (day, name) in ["app-access.2026-03-10.log", "app-access.2026-03-11.log"]
            .iter()
            .enumerate()
        {
            let content = std::fs::read_to_string(temp_dir.path().join(name)).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), THREADS * LINES_PER_DAY);
            for line in lines {
                let parts: Vec<&str> = line.split(' ').collect();
                assert_eq!(parts.len(), 6, "torn line: {:?}", line);
                assert_eq!(parts[3], day.to_string(), "line in wrong file: {:?}", line);
            }
        }

        assert_eq!(
            active.snapshot(),
            vec![temp_dir.path().join("app-access.2026-03-11.log")]
        );
    }
}
