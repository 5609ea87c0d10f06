//! Reconciliation poller
//!
//! Ticks the [`ReconciliationPipeline`] on a fixed period until cancelled.
//! Tick failures are logged and counted, never returned: the loop only ends
//! through its [`CancellationToken`]. Ticks never overlap, and cancellation is
//! observed between ticks, so an in-flight tick always runs to completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::pipeline::ReconciliationPipeline;
use crate::error::{PagientError, Result};
use crate::logging::log_error;

/// Runtime statistics for the poller
#[derive(Debug, Default)]
pub struct PollerStats {
    ticks: AtomicU64,
    failed_ticks: AtomicU64,
    patients_called: AtomicU64,
    patients_finished: AtomicU64,
}

impl PollerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }

    pub fn patients_called(&self) -> u64 {
        self.patients_called.load(Ordering::Relaxed)
    }

    pub fn patients_finished(&self) -> u64 {
        self.patients_finished.load(Ordering::Relaxed)
    }
}

pub struct ReconciliationPoller {
    poller_id: Uuid,
    pipeline: ReconciliationPipeline,
    stats: Arc<PollerStats>,
}

impl std::fmt::Debug for ReconciliationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationPoller")
            .field("poller_id", &self.poller_id)
            .field("pipeline", &self.pipeline)
            .field("ticks", &self.stats.ticks())
            .finish()
    }
}

impl ReconciliationPoller {
    pub fn new(pipeline: ReconciliationPipeline) -> Self {
        Self {
            poller_id: Uuid::new_v4(),
            pipeline,
            stats: Arc::new(PollerStats::default()),
        }
    }

    pub fn poller_id(&self) -> Uuid {
        self.poller_id
    }

    pub fn stats(&self) -> Arc<PollerStats> {
        self.stats.clone()
    }

    /// Tick every `period` until `cancel` fires.
    ///
    /// Returns `Ok(())` once cancelled. A zero period is rejected up front.
    pub async fn run(&mut self, period: Duration, cancel: CancellationToken) -> Result<()> {
        if period.is_zero() {
            return Err(PagientError::Configuration(
                "polling period must be greater than zero".to_string(),
            ));
        }

        info!(
            poller_id = %self.poller_id,
            room = %self.pipeline.room_label(),
            interval_ms = period.as_millis() as u64,
            "Starting reconciliation poller"
        );

        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.run_tick().await,
            }
        }

        info!(
            poller_id = %self.poller_id,
            ticks = self.stats.ticks(),
            failed_ticks = self.stats.failed_ticks(),
            "Reconciliation poller stopped"
        );
        Ok(())
    }

    async fn run_tick(&mut self) {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        match self.pipeline.tick().await {
            Ok(report) => {
                self.stats
                    .patients_called
                    .fetch_add(report.called as u64, Ordering::Relaxed);
                self.stats
                    .patients_finished
                    .fetch_add(report.finished as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.failed_ticks.fetch_add(1, Ordering::Relaxed);
                error!(
                    poller_id = %self.poller_id,
                    error = %e,
                    "Reconciliation tick failed"
                );
            }
        }
    }
}

/// Start/stop control over a poller running on its own tokio task
#[derive(Debug)]
pub struct PollerHandle {
    poller: Mutex<Option<ReconciliationPoller>>,
    task: Mutex<Option<JoinHandle<Result<()>>>>,
    cancel: CancellationToken,
    stats: Arc<PollerStats>,
    poller_id: Uuid,
}

impl PollerHandle {
    pub fn new(poller: ReconciliationPoller) -> Self {
        Self {
            stats: poller.stats(),
            poller_id: poller.poller_id(),
            poller: Mutex::new(Some(poller)),
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the poller. Starting twice is a logged no-op.
    pub fn start(&self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(PagientError::Configuration(
                "polling period must be greater than zero".to_string(),
            ));
        }

        let Some(mut poller) = self.poller.lock().take() else {
            warn!(poller_id = %self.poller_id, "Poller already started");
            return Ok(());
        };

        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move { poller.run(period, cancel).await });
        *self.task.lock() = Some(task);

        debug!(poller_id = %self.poller_id, "Poller task spawned");
        Ok(())
    }

    /// Signal cancellation without waiting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the in-flight tick to finish
    pub async fn stop(&self) -> Result<()> {
        self.cancel.cancel();

        let task = self.task.lock().take();
        let Some(task) = task else {
            return Ok(());
        };

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                log_error(
                    "reconciliation_poller",
                    "stop",
                    &join_error.to_string(),
                    Some(&self.poller_id.to_string()),
                );
                Ok(())
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn stats(&self) -> Arc<PollerStats> {
        self.stats.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
