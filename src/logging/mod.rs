//! Logging system for daylog
//!
//! Provides daily-rotating access/error streams, the level-tagged logger on top
//! of them, and the retention sweep that archives and prunes old files.

mod bootstrap;
mod file_writer;
mod logger;
mod registry;
mod retention;
mod sweeper;

pub use bootstrap::{init, start, Logging};
pub use file_writer::{log_file_name, RotatingFileWriter, StreamMakeWriter, StreamWriter};
pub use logger::{format_line, Level, Logger};
pub use registry::{ActiveFiles, ActiveFilesGuard};
pub use retention::{
    age_in_days, classify, compress, compress_and_remove, is_archive, sweep, SweepAction,
    SweepReport,
};
pub use sweeper::{RetentionSweeper, SweeperHandle};
