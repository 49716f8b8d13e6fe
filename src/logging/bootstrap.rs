//! Wiring for the access/error streams, the sweeper and tracing

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::file_writer::{RotatingFileWriter, StreamMakeWriter};
use super::logger::Logger;
use super::registry::ActiveFiles;
use super::retention::SweepReport;
use super::sweeper::{RetentionSweeper, SweeperHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::LogConfig;

/// Running logging system: both streams plus the retention sweeper
pub struct Logging {
    logger: Logger,
    active: Arc<ActiveFiles>,
    sweeper: SweeperHandle,
}

impl Logging {
    /// Level-tagged logger over both streams
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Registry of files currently held open
    pub fn active_files(&self) -> &Arc<ActiveFiles> {
        &self.active
    }

    /// Stop the sweeper and flush both streams
    pub async fn shutdown(self) -> Result<()> {
        self.sweeper.stop().await;
        self.logger.flush().context("Failed to flush log streams")
    }
}

/// Build both streams and spawn the sweeper without touching global state
///
/// Must be called from within a Tokio runtime.
pub fn start(
    config: &LogConfig,
    clock: Arc<dyn Clock>,
    reports: Option<mpsc::Sender<SweepReport>>,
) -> Result<Logging> {
    let (logger, active, sweeper) = prepare(config, clock, reports)?;

    Ok(Logging {
        logger,
        active,
        sweeper: sweeper.spawn(),
    })
}

fn prepare(
    config: &LogConfig,
    clock: Arc<dyn Clock>,
    reports: Option<mpsc::Sender<SweepReport>>,
) -> Result<(Logger, Arc<ActiveFiles>, RetentionSweeper)> {
    config.ensure_directories()?;

    let active = Arc::new(ActiveFiles::new());
    let access = Arc::new(RotatingFileWriter::new(
        config.access_stream(),
        &config.log_dir,
        Arc::clone(&clock),
        Arc::clone(&active),
    ));
    let error = Arc::new(RotatingFileWriter::new(
        config.error_stream(),
        &config.log_dir,
        Arc::clone(&clock),
        Arc::clone(&active),
    ));

    let logger = Logger::new(
        config.app_name.clone(),
        access,
        error,
        Arc::clone(&clock),
        config.console,
    );

    let mut sweeper = RetentionSweeper::new(
        &config.log_dir,
        Arc::clone(&active),
        clock,
        config.sweep_interval,
    );
    if let Some(sender) = reports {
        sweeper = sweeper.with_reports(sender);
    }

    Ok((logger, active, sweeper))
}

/// Initialize logging for the process
///
/// Starts both streams on the wall clock, installs a global tracing subscriber
/// that writes this crate's diagnostics into the access stream, and spawns the
/// sweeper (which sweeps once immediately).
pub fn init(config: &LogConfig) -> Result<Logging> {
    let (logger, active, sweeper) = prepare(config, Arc::new(SystemClock), None)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(StreamMakeWriter::new(Arc::clone(logger.access())))
        .with_ansi(false)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "daylog=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging to {}", config.log_dir.display());

    // Spawned only once the subscriber is in place so its startup events land
    Ok(Logging {
        logger,
        active,
        sweeper: sweeper.spawn(),
    })
}
