use std::sync::Arc;

use tracing::{debug, info, warn};

use super::reconciler::Reconciler;
use super::snapshot::Snapshot;
use crate::bridge::ExternalQueueSource;
use crate::constants::status_groups;
use crate::database::PatientStore;
use crate::error::{PagientError, Result};
use crate::state_machine::PatientStateMachine;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries in the queue read this tick
    pub queue_len: usize,
    /// Patients paged successfully
    pub called: usize,
    /// Pages that failed and were rolled back
    pub call_failures: usize,
    pub finished: usize,
    /// Patients skipped for validation, concurrency or persistence reasons
    pub skipped: usize,
}

impl TickReport {
    /// Nothing was called, finished or skipped
    pub fn is_quiet(&self) -> bool {
        self.called == 0 && self.call_failures == 0 && self.finished == 0 && self.skipped == 0
    }
}

/// One reconciliation pass: read, reconcile, transition.
///
/// Holds the previous [`Snapshot`] between ticks. A tick whose reads fail
/// leaves it untouched; any tick that gets past the reads replaces it.
pub struct ReconciliationPipeline {
    store: Arc<dyn PatientStore>,
    source: Arc<dyn ExternalQueueSource>,
    state_machine: PatientStateMachine,
    room_label: String,
    queue_limit: Option<u32>,
    previous: Option<Snapshot>,
}

impl std::fmt::Debug for ReconciliationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationPipeline")
            .field("room_label", &self.room_label)
            .field("queue_limit", &self.queue_limit)
            .field("previous_len", &self.previous.as_ref().map(Snapshot::len))
            .finish_non_exhaustive()
    }
}

impl ReconciliationPipeline {
    pub fn new(
        store: Arc<dyn PatientStore>,
        source: Arc<dyn ExternalQueueSource>,
        state_machine: PatientStateMachine,
        room_label: impl Into<String>,
        queue_limit: Option<u32>,
    ) -> Self {
        Self {
            store,
            source,
            state_machine,
            room_label: room_label.into(),
            queue_limit,
            previous: None,
        }
    }

    pub fn previous_snapshot(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn room_label(&self) -> &str {
        &self.room_label
    }

    /// Run one tick.
    ///
    /// Only a failed read is returned as an error. Per-patient failures are
    /// logged and counted in the report.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let candidates = self
            .store
            .get_by_status(status_groups::FINISH_CANDIDATE_STATES)
            .await
            .map_err(PagientError::source_read)?;

        let entries = self
            .source
            .fetch_queue(&self.room_label, self.queue_limit)
            .await?;
        let current = Snapshot::capture(entries);

        let plan = Reconciler::plan(&candidates, self.previous.as_ref(), &current);
        let mut report = TickReport {
            queue_len: current.len(),
            ..TickReport::default()
        };

        for patient_id in plan.call {
            match self.state_machine.call_patient(patient_id).await {
                Ok(_) => report.called += 1,
                Err(error) => {
                    let error = PagientError::from(error);
                    if matches!(error, PagientError::ExternalService { .. }) {
                        report.call_failures += 1;
                    } else {
                        report.skipped += 1;
                    }
                    warn!(patient_id, error = %error, "Calling patient failed");
                }
            }
        }

        for patient_id in plan.finished {
            match self.state_machine.finish_patient(patient_id).await {
                Ok(_) => report.finished += 1,
                Err(error) => {
                    report.skipped += 1;
                    warn!(
                        patient_id,
                        error = %PagientError::from(error),
                        "Finishing patient failed"
                    );
                }
            }
        }

        let captured_at = current.captured_at();
        self.previous = Some(current);

        if report.is_quiet() {
            debug!(
                room = %self.room_label,
                queue_len = report.queue_len,
                captured_at = %captured_at,
                "Tick complete"
            );
        } else {
            info!(
                room = %self.room_label,
                queue_len = report.queue_len,
                captured_at = %captured_at,
                called = report.called,
                call_failures = report.call_failures,
                finished = report.finished,
                skipped = report.skipped,
                "Tick complete"
            );
        }

        Ok(report)
    }
}
