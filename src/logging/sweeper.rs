//! Background retention sweeper
//!
//! Runs one sweep at startup and then one per interval until stopped. Each
//! sweep runs on the blocking pool; a panic inside it is logged and the loop
//! carries on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::registry::ActiveFiles;
use super::retention::{sweep, SweepReport};
use crate::clock::Clock;

/// Periodic retention sweep over one log directory
pub struct RetentionSweeper {
    dir: PathBuf,
    active: Arc<ActiveFiles>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    reports: Option<mpsc::Sender<SweepReport>>,
}

impl RetentionSweeper {
    /// Create a sweeper for `dir`
    pub fn new(
        dir: impl Into<PathBuf>,
        active: Arc<ActiveFiles>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            active,
            clock,
            interval,
            reports: None,
        }
    }

    /// Forward every sweep's report to `sender`
    ///
    /// Reports are dropped (with a warning) when the channel is full.
    pub fn with_reports(mut self, sender: mpsc::Sender<SweepReport>) -> Self {
        self.reports = Some(sender);
        self
    }

    /// Start the sweep loop on the current Tokio runtime
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.run(shutdown_rx));

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(
            dir = %self.dir.display(),
            interval_secs = self.interval.as_secs(),
            "Retention sweeper started"
        );

        loop {
            self.sweep_once().await;

            // One-shot sleep re-armed after each sweep
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown_rx => break,
            }
        }

        info!("Retention sweeper stopped");
    }

    async fn sweep_once(&self) {
        let dir = self.dir.clone();
        let active = Arc::clone(&self.active);
        let clock = Arc::clone(&self.clock);

        let result =
            tokio::task::spawn_blocking(move || sweep(&dir, &active, clock.as_ref())).await;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("Retention sweep failed: {}", e);
                return;
            }
        };

        for path in &report.removed {
            debug!("Removed expired log {}", path.display());
        }
        for path in &report.compressed {
            debug!("Archived log to {}", path.display());
        }
        for err in &report.errors {
            warn!("Retention sweep: {}", format_error_chain(err));
        }
        if !report.is_empty() {
            info!(
                removed = report.removed.len(),
                compressed = report.compressed.len(),
                errors = report.errors.len(),
                "Retention sweep finished"
            );
        }

        if let Some(sender) = &self.reports {
            match sender.try_send(report) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Sweep report channel full, dropping report");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }
}

fn format_error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Handle to control a running sweeper
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep loop and wait for it to exit
    ///
    /// A sweep already in progress finishes first.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the loop already exited
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!("Retention sweeper task failed: {}", e);
        }
    }

    /// Check whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
