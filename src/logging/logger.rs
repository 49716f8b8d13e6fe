//! Level-tagged logging over the access and error streams
//!
//! Every line goes to stdout (when enabled) and to the access stream. SYSTEM,
//! ERROR and FATAL lines also go to the error stream; ERROR and FATAL carry the
//! caller location and a backtrace.

use std::backtrace::Backtrace;
use std::fmt::Display;
use std::panic::Location;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::file_writer::RotatingFileWriter;
use crate::clock::Clock;
use crate::error::LogError;

/// Level of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    System,
    Error,
    Fatal,
}

impl Level {
    /// Get the tag written into each line
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::System => "SYSTEM",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Parse a level tag (case-insensitive)
    pub fn parse(tag: &str) -> Option<Level> {
        match tag.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Level::Debug),
            "INFO" => Some(Level::Info),
            "WARN" => Some(Level::Warn),
            "SYSTEM" => Some(Level::System),
            "ERROR" => Some(Level::Error),
            "FATAL" => Some(Level::Fatal),
            _ => None,
        }
    }

    /// Check if lines at this level also go to the error stream
    pub fn writes_error_stream(&self) -> bool {
        matches!(self, Level::System | Level::Error | Level::Fatal)
    }

    /// Check if lines at this level carry caller location and backtrace
    pub fn captures_trace(&self) -> bool {
        matches!(self, Level::Error | Level::Fatal)
    }
}

/// Format one line: `<YYYY/MM/DD HH:MM:SS> <LEVEL> [<app> <file>:<line> -] <message>`
pub fn format_line(
    at: DateTime<Local>,
    level: Level,
    caller: Option<(&str, &Location<'_>)>,
    message: &dyn Display,
) -> String {
    let mut line = format!("{} {}", at.format("%Y/%m/%d %H:%M:%S"), level.as_str());
    if let Some((app_name, location)) = caller {
        let file = location
            .file()
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_else(|| location.file());
        line.push_str(&format!(" {} {}:{} -", app_name, file, location.line()));
    }
    line.push_str(&format!(" {}\n", message));
    line
}

/// Dispatches level-tagged lines to console and the two streams
#[derive(Clone)]
pub struct Logger {
    app_name: String,
    access: Arc<RotatingFileWriter>,
    error: Arc<RotatingFileWriter>,
    clock: Arc<dyn Clock>,
    console: bool,
}

impl Logger {
    /// Create a logger over the given streams
    pub fn new(
        app_name: impl Into<String>,
        access: Arc<RotatingFileWriter>,
        error: Arc<RotatingFileWriter>,
        clock: Arc<dyn Clock>,
        console: bool,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            access,
            error,
            clock,
            console,
        }
    }

    /// Access stream writer
    pub fn access(&self) -> &Arc<RotatingFileWriter> {
        &self.access
    }

    /// Error stream writer
    pub fn error_stream(&self) -> &Arc<RotatingFileWriter> {
        &self.error
    }

    /// Write one line at `level`, reporting failures to the caller
    #[track_caller]
    pub fn record(&self, level: Level, message: &dyn Display) -> Result<(), LogError> {
        let caller = Location::caller();
        self.record_at(level, message, caller)
    }

    fn record_at(
        &self,
        level: Level,
        message: &dyn Display,
        caller: &Location<'_>,
    ) -> Result<(), LogError> {
        let trace = level.captures_trace();
        let located = trace.then_some((self.app_name.as_str(), caller));
        let line = format_line(self.clock.now(), level, located, message);

        let detailed = if trace {
            format!("{}{}\n", line, Backtrace::force_capture())
        } else {
            line.clone()
        };

        if self.console {
            print!("{}", detailed);
        }

        let mut result = write_stream(&self.access, line.as_bytes());
        if level.writes_error_stream() {
            let error_result = write_stream(&self.error, detailed.as_bytes());
            result = result.and(error_result);
        }
        result
    }

    #[track_caller]
    fn emit(&self, level: Level, message: &dyn Display) {
        if let Err(e) = self.record_at(level, message, Location::caller()) {
            tracing::warn!("Dropped {} log line: {}", level.as_str(), e);
        }
    }

    /// Log at DEBUG (access stream)
    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.emit(Level::Debug, &message);
    }

    /// Log at INFO (access stream)
    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.emit(Level::Info, &message);
    }

    /// Log at WARN (access stream)
    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        self.emit(Level::Warn, &message);
    }

    /// Log at SYSTEM (access and error streams)
    #[track_caller]
    pub fn system(&self, message: impl Display) {
        self.emit(Level::System, &message);
    }

    /// Log at ERROR with caller location and backtrace
    #[track_caller]
    pub fn error(&self, message: impl Display) {
        self.emit(Level::Error, &message);
    }

    /// Log at FATAL, flush both streams, and exit the process with status 1
    #[track_caller]
    pub fn fatal(&self, message: impl Display) -> ! {
        self.emit(Level::Fatal, &message);
        let _ = self.access.flush();
        let _ = self.error.flush();
        std::process::exit(1)
    }

    /// Flush both streams
    pub fn flush(&self) -> std::io::Result<()> {
        self.access.flush()?;
        self.error.flush()
    }
}

fn write_stream(writer: &RotatingFileWriter, bytes: &[u8]) -> Result<(), LogError> {
    writer.write_all(bytes).map_err(|source| LogError::Write {
        stream: writer.stream().to_string(),
        source,
    })
}
