// zkvrm-snapshot/src/scheduler/mod.rs
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backup::{ObjectStore, S3ObjectStore, SnapshotUploadResult, perform_snapshot_upload};
use crate::config::{EnabledSnapshotConfig, SnapshotConfig, TRACING_TARGET};
use crate::errors::{Result, SnapshotError};
use crate::utils::format::{format_bytes, format_duration};

/// Timer loop and manual trigger sharing one run lock. Share it behind an [`Arc`].
pub struct SnapshotScheduler {
    config: SnapshotConfig,
    store: Option<Arc<dyn ObjectStore>>,
    has_started: AtomicBool,
    is_running: AtomicBool,
}

impl SnapshotScheduler {
    pub fn new(config: SnapshotConfig, store: Option<Arc<dyn ObjectStore>>) -> Self {
        SnapshotScheduler {
            config,
            store,
            has_started: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
        }
    }

    /// Builds the scheduler with an S3 client when snapshots are enabled.
    pub async fn from_config(config: SnapshotConfig) -> Self {
        let store = match &config {
            SnapshotConfig::Enabled(cfg) => {
                Some(Arc::new(S3ObjectStore::connect(cfg).await) as Arc<dyn ObjectStore>)
            }
            SnapshotConfig::Disabled { .. } => None,
        };
        Self::new(config, store)
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Arms the recurring snapshot loop. Only the first call does anything.
    ///
    /// Returns the loop's task handle, or `None` when snapshots are disabled or
    /// the loop was already started. The loop stops once `shutdown` is
    /// cancelled; a run in progress is allowed to finish first.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if self.has_started.swap(true, Ordering::AcqRel) {
            return None;
        }

        let config = match &self.config {
            SnapshotConfig::Disabled { reason } => {
                info!(target: TRACING_TARGET, "{}", reason);
                return None;
            }
            SnapshotConfig::Enabled(config) => config,
        };

        info!(
            target: TRACING_TARGET,
            bucket = %config.bucket,
            interval_ms = config.interval_ms,
            initial_delay_ms = config.initial_delay_ms,
            "Enabled. {}",
            config.describe()
        );

        let scheduler = Arc::clone(self);
        Some(tokio::spawn(async move {
            scheduler.run_loop(shutdown).await;
        }))
    }

    /// Fixed-delay loop: wait, run, wait again. The next wait starts only once
    /// the previous run has finished, so slow runs push later ones back.
    async fn run_loop(&self, shutdown: CancellationToken) {
        let SnapshotConfig::Enabled(config) = &self.config else {
            return;
        };

        let mut delay = config.initial_delay();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(target: TRACING_TARGET, "Snapshot scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            self.run_scheduled_snapshot().await;
            delay = config.interval();
        }
    }

    /// One timer-driven run. Never fails: overlap is a skipped cycle and any
    /// other error is logged, leaving the next cycle as the retry.
    pub async fn run_scheduled_snapshot(&self) {
        match self.run_snapshot_with_lock().await {
            Ok(result) => self.log_successful_upload(&result),
            Err(SnapshotError::InProgress) => {
                warn!(
                    target: TRACING_TARGET,
                    "Previous snapshot still in progress; skipping this run"
                );
            }
            Err(e) => {
                error!(target: TRACING_TARGET, error = %e, "Failed to upload snapshot");
            }
        }
    }

    /// Manual trigger, outside the timer cadence. Disabled and in-progress
    /// conditions are returned to the caller.
    pub async fn upload_now(&self) -> Result<SnapshotUploadResult> {
        let result = self.run_snapshot_with_lock().await?;
        self.log_successful_upload(&result);
        Ok(result)
    }

    /// Performs one snapshot upload, failing fast with
    /// [`SnapshotError::InProgress`] if another run holds the lock.
    pub async fn run_snapshot_with_lock(&self) -> Result<SnapshotUploadResult> {
        let (config, store) = self.enabled()?;
        let _guard = RunGuard::acquire(&self.is_running)?;
        perform_snapshot_upload(config, store.as_ref()).await
    }

    fn enabled(&self) -> Result<(&EnabledSnapshotConfig, &Arc<dyn ObjectStore>)> {
        match (&self.config, &self.store) {
            (SnapshotConfig::Enabled(config), Some(store)) => Ok((config, store)),
            (SnapshotConfig::Enabled(_), None) => Err(SnapshotError::Disabled(
                "S3 snapshots disabled: S3 client failed to initialise.".to_string(),
            )),
            (SnapshotConfig::Disabled { reason }, _) => Err(SnapshotError::Disabled(reason.clone())),
        }
    }

    fn log_successful_upload(&self, result: &SnapshotUploadResult) {
        let bucket = match &self.config {
            SnapshotConfig::Enabled(config) => config.bucket.as_str(),
            SnapshotConfig::Disabled { .. } => "",
        };
        info!(
            target: TRACING_TARGET,
            object_key = %result.object_key,
            bytes = result.bytes,
            duration_ms = result.duration_ms,
            "Uploaded s3://{}/{} ({}) in {}",
            bucket,
            result.object_key,
            format_bytes(result.bytes),
            format_duration(result.duration_ms)
        );
    }
}

/// Holds the run lock; releasing happens on drop so a failed, panicked or
/// cancelled run never leaves the scheduler stuck.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SnapshotError::InProgress)?;
        Ok(RunGuard { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
