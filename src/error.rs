//! Error types for rotation, retention and level dispatch

use std::io;
use std::path::PathBuf;

/// Failures raised by the writers and the retention sweep
///
/// Every variant carries the path involved and the underlying IO error.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log directory could not be listed
    #[error("failed to read log directory {}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A new day's log file could not be opened
    #[error("failed to open log file {}", path.display())]
    RotationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An expired or archived file could not be removed
    #[error("failed to remove {}", path.display())]
    FileRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Gzip archiving of an aged log file failed
    #[error("failed to compress {}", path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Appending a line to a stream failed
    #[error("failed to write to log stream {stream}")]
    Write {
        stream: String,
        #[source]
        source: io::Error,
    },
}

impl LogError {
    /// Path of the file or directory the error concerns, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            LogError::DirectoryRead { path, .. }
            | LogError::RotationFailed { path, .. }
            | LogError::FileRemove { path, .. }
            | LogError::Compression { path, .. } => Some(path),
            LogError::Write { .. } => None,
        }
    }

    /// Wrap this error into an `io::Error`, keeping the source's kind
    pub fn into_io(self) -> io::Error {
        let kind = match &self {
            LogError::DirectoryRead { source, .. }
            | LogError::RotationFailed { source, .. }
            | LogError::FileRemove { source, .. }
            | LogError::Compression { source, .. }
            | LogError::Write { source, .. } => source.kind(),
        };
        io::Error::new(kind, self)
    }
}
