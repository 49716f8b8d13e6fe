//! Registry of log files currently held open by writers
//!
//! Writers register their target path while holding the registry lock, and the
//! retention sweep holds the same lock from its membership check through any
//! delete or compress, so a file can never be swept while it is live.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Shared set of active log file paths
#[derive(Debug, Default)]
pub struct ActiveFiles {
    paths: Mutex<HashSet<PathBuf>>,
}

impl ActiveFiles {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the registry
    pub fn lock(&self) -> ActiveFilesGuard<'_> {
        ActiveFilesGuard {
            paths: self
                .paths
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    /// Check whether a path is active
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Snapshot of all active paths
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().paths.iter().cloned().collect()
    }
}

/// Held lock on an [`ActiveFiles`] registry
pub struct ActiveFilesGuard<'a> {
    paths: MutexGuard<'a, HashSet<PathBuf>>,
}

impl ActiveFilesGuard<'_> {
    /// Check whether a path is active
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Replace `old` (if any) with `new`
    pub fn replace(&mut self, old: Option<&Path>, new: PathBuf) {
        if let Some(old) = old {
            self.paths.remove(old);
        }
        self.paths.insert(new);
    }

    /// Remove a path
    pub fn remove(&mut self, path: &Path) {
        self.paths.remove(path);
    }
}
