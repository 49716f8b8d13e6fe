//! daylog - daily-rotating access/error log files with gzip retention
//!
//! This library provides the rotating writers, the level-tagged logger and the
//! background retention sweeper.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
