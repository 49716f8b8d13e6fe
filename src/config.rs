//! Configuration for the log directory and streams

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files older than this many days are compressed
pub const COMPRESS_AFTER_DAYS: i64 = 3;

/// Files older than this many days are deleted
pub const DELETE_AFTER_DAYS: i64 = 7;

/// Suffix of archived log files
pub const ARCHIVE_SUFFIX: &str = ".gz";

/// Default time between retention sweeps (24 hours)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding both streams' files and their archives
    pub log_dir: PathBuf,

    /// Application name, used as the stream prefix
    pub app_name: String,

    /// Mirror every line to stdout
    pub console: bool,

    /// Time between retention sweeps after the startup sweep
    pub sweep_interval: Duration,
}

impl LogConfig {
    /// Create a configuration for an explicit directory and application name
    pub fn new(log_dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            app_name: app_name.into(),
            console: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Derive the configuration from the running executable
    ///
    /// Logs go to `<exec dir>/log/<app name>/`, where the app name is the
    /// executable's file stem.
    pub fn from_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        Self::from_exe_path(&exe)
    }

    /// Derive the configuration from an executable path
    pub fn from_exe_path(exe: &Path) -> Result<Self> {
        let app_name = exe
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("Executable path has no file name: {}", exe.display()))?
            .to_string();
        let exec_dir = exe
            .parent()
            .with_context(|| format!("Executable path has no parent: {}", exe.display()))?;

        Ok(Self::new(exec_dir.join("log").join(&app_name), app_name))
    }

    /// Disable or enable stdout mirroring
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Override the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Name of the access stream (`<app>-access`)
    pub fn access_stream(&self) -> String {
        format!("{}-access", self.app_name)
    }

    /// Name of the error stream (`<app>-error`)
    pub fn error_stream(&self) -> String {
        format!("{}-error", self.app_name)
    }

    /// Ensure the log directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir).with_context(|| {
            format!("Failed to create log directory {}", self.log_dir.display())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_exe_path() {
        let config = LogConfig::from_exe_path(Path::new("/opt/svc/bin/gateway")).unwrap();
        assert_eq!(config.app_name, "gateway");
        assert_eq!(config.log_dir, PathBuf::from("/opt/svc/bin/log/gateway"));
        assert_eq!(config.access_stream(), "gateway-access");
        assert_eq!(config.error_stream(), "gateway-error");
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert!(config.console);
    }

    #[test]
    fn test_from_exe_path_strips_extension() {
        let config = LogConfig::from_exe_path(Path::new("/srv/gateway.exe")).unwrap();
        assert_eq!(config.app_name, "gateway");
    }

    #[test]
    fn test_from_exe_path_without_name() {
        assert!(LogConfig::from_exe_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_current_exe_does_not_panic() {
        let config = LogConfig::from_current_exe().unwrap();
        assert!(config.log_dir.ends_with(&config.app_name));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config = LogConfig::new(temp_dir.path().join("log").join("app"), "app");
        config.ensure_directories().unwrap();
        assert!(config.log_dir.is_dir());

        // Second call is a no-op
        config.ensure_directories().unwrap();
    }
}
