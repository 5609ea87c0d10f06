use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{
    errors::{GuardError, StateMachineError, StateMachineResult},
    events::PatientEvent,
    guards::{PagerAssignedGuard, StateGuard},
    states::PatientStatus,
};
use crate::database::PatientStore;
use crate::dispatch::{CallDispatcher, DispatchError};
use crate::events::NotificationSink;
use crate::logging::{log_error, log_patient_operation};
use crate::models::Patient;

/// Patient lifecycle state machine.
///
/// Owns every status change the engine makes: it determines the target state,
/// checks guards, persists through the [`PatientStore`] and announces the
/// stored record through the [`NotificationSink`]. Paging goes through the
/// [`CallDispatcher`] and is bounded by `dispatch_timeout`.
#[derive(Clone)]
pub struct PatientStateMachine {
    store: Arc<dyn PatientStore>,
    dispatcher: Arc<dyn CallDispatcher>,
    notifier: Arc<dyn NotificationSink>,
    dispatch_timeout: Duration,
}

impl std::fmt::Debug for PatientStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientStateMachine")
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish_non_exhaustive()
    }
}

impl PatientStateMachine {
    pub fn new(
        store: Arc<dyn PatientStore>,
        dispatcher: Arc<dyn CallDispatcher>,
        notifier: Arc<dyn NotificationSink>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            notifier,
            dispatch_timeout,
        }
    }

    /// Apply one event to an already loaded patient, persist and notify.
    ///
    /// Returns the stored patient, carrying its new version.
    pub async fn transition(
        &self,
        patient: &Patient,
        event: PatientEvent,
    ) -> StateMachineResult<Patient> {
        let current_state = patient.status;
        let target_state = self.determine_target_state(current_state, &event)?;

        self.check_guards(patient, target_state)?;

        let mut next = patient.clone();
        next.status = target_state;
        let stored = self.store.update(&next).await?;

        self.notifier.notify_updated(&stored);
        log_patient_operation(
            event.event_type(),
            stored.id,
            Some(current_state.as_str()),
            Some(target_state.as_str()),
            "transitioned",
            event.error_message(),
        );

        Ok(stored)
    }

    /// Page a pending patient: `pending → call → called`.
    ///
    /// `call` is persisted before the pager is contacted. A failed or timed
    /// out page rolls the patient back to `pending` and returns
    /// [`StateMachineError::ExternalService`].
    pub async fn call_patient(&self, patient_id: i64) -> StateMachineResult<Patient> {
        let patient = self.store.get_by_id(patient_id).await?;
        self.call(&patient).await
    }

    /// Move a patient who left the queue to `finished`
    pub async fn finish_patient(&self, patient_id: i64) -> StateMachineResult<Patient> {
        let patient = self.store.get_by_id(patient_id).await?;
        self.transition(&patient, PatientEvent::Finish).await
    }

    /// Route an administrative status change through the same edge set.
    ///
    /// Requesting the current status is a no-op. `call` runs the full paging
    /// flow and `finished` finishes; any other change is an invalid transition.
    pub async fn apply_status_edit(
        &self,
        patient_id: i64,
        target: PatientStatus,
    ) -> StateMachineResult<Patient> {
        let patient = self.store.get_by_id(patient_id).await?;

        if patient.status == target {
            debug!(patient_id, status = %target, "Status edit is a no-op");
            return Ok(patient);
        }

        match target {
            PatientStatus::Call => self.call(&patient).await,
            PatientStatus::Finished => self.transition(&patient, PatientEvent::Finish).await,
            other => Err(StateMachineError::InvalidTransition {
                from: patient.status.to_string(),
                event: format!("set_{other}"),
            }),
        }
    }

    async fn call(&self, patient: &Patient) -> StateMachineResult<Patient> {
        let calling = self.transition(patient, PatientEvent::Call).await?;

        let pager = calling.pager.clone().ok_or(GuardError::NoPagerAssigned {
            patient_id: calling.id,
        })?;

        let outcome = match tokio::time::timeout(
            self.dispatch_timeout,
            self.dispatcher.dispatch(&pager),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(DispatchError::Timeout {
                timeout_ms: self.dispatch_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(()) => self.transition(&calling, PatientEvent::DispatchSucceeded).await,
            Err(dispatch_error) => {
                let reason = dispatch_error.to_string();
                warn!(
                    patient_id = calling.id,
                    pager_id = pager.id,
                    error = %reason,
                    "Pager call failed, rolling back to pending"
                );

                // Left in `call` if the rollback fails, so the pager is not paged twice
                if let Err(rollback_error) = self
                    .transition(&calling, PatientEvent::dispatch_failed(reason))
                    .await
                {
                    log_error(
                        "patient_state_machine",
                        "rollback_call",
                        &rollback_error.to_string(),
                        Some(&format!("patient {}", calling.id)),
                    );
                }

                Err(StateMachineError::from(dispatch_error))
            }
        }
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        &self,
        current_state: PatientStatus,
        event: &PatientEvent,
    ) -> StateMachineResult<PatientStatus> {
        event
            .target_from(current_state)
            .ok_or_else(|| StateMachineError::InvalidTransition {
                from: current_state.to_string(),
                event: event.event_type().to_string(),
            })
    }

    /// Check guard conditions for the transition
    fn check_guards(&self, patient: &Patient, target_state: PatientStatus) -> StateMachineResult<()> {
        if target_state.is_paging() {
            let guard = PagerAssignedGuard;
            if let Err(error) = guard.check(patient, target_state) {
                debug!(patient_id = patient.id, guard = guard.description(), "Guard rejected transition");
                return Err(error.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{patient, TestCollaborators};

    fn machine(collaborators: &TestCollaborators, timeout: Duration) -> PatientStateMachine {
        PatientStateMachine::new(
            collaborators.store.clone(),
            collaborators.dispatcher.clone(),
            collaborators.sink.clone(),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_call_pages_and_marks_called() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Pending, Some(1))]);
        let sm = machine(&c, Duration::from_secs(1));

        let called = sm.call_patient(1).await.unwrap();

        assert_eq!(called.status, PatientStatus::Called);
        assert_eq!(called.version, 2);
        assert_eq!(c.dispatcher.dispatched(), vec![1]);
        assert_eq!(
            c.sink.updates_for(1),
            vec![PatientStatus::Call, PatientStatus::Called]
        );
    }

    #[tokio::test]
    async fn test_failed_call_rolls_back_to_pending() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Pending, Some(1))]);
        c.dispatcher.fail_for(1);
        let sm = machine(&c, Duration::from_secs(1));

        let err = sm.call_patient(1).await.unwrap_err();

        assert!(matches!(err, StateMachineError::ExternalService { .. }));
        assert_eq!(c.store.status_of(1), Some(PatientStatus::Pending));
        assert_eq!(
            c.sink.updates_for(1),
            vec![PatientStatus::Call, PatientStatus::Pending]
        );
    }

    #[tokio::test]
    async fn test_slow_dispatch_times_out_and_rolls_back() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Pending, Some(1))]);
        c.dispatcher.set_delay(Duration::from_millis(200));
        let sm = machine(&c, Duration::from_millis(20));

        let err = sm.call_patient(1).await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(c.store.status_of(1), Some(PatientStatus::Pending));
    }

    #[tokio::test]
    async fn test_call_without_pager_is_guarded() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Pending, None)]);
        let sm = machine(&c, Duration::from_secs(1));

        let err = sm.call_patient(1).await.unwrap_err();

        assert!(matches!(err, StateMachineError::GuardFailed { .. }));
        assert!(c.dispatcher.dispatched().is_empty());
        assert_eq!(c.store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_call_is_only_valid_from_pending() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Called, Some(1))]);
        let sm = machine(&c, Duration::from_secs(1));

        assert!(matches!(
            sm.call_patient(1).await,
            Err(StateMachineError::InvalidTransition { .. })
        ));
        assert!(c.dispatcher.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_finish_from_every_active_state() {
        let c = TestCollaborators::new([
            patient(1, PatientStatus::Pending, None),
            patient(2, PatientStatus::Call, Some(2)),
            patient(3, PatientStatus::Called, Some(3)),
        ]);
        let sm = machine(&c, Duration::from_secs(1));

        for id in 1..=3 {
            let finished = sm.finish_patient(id).await.unwrap();
            assert_eq!(finished.status, PatientStatus::Finished);
        }
        assert!(matches!(
            sm.finish_patient(1).await,
            Err(StateMachineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_patient_is_not_found() {
        let c = TestCollaborators::new([]);
        let sm = machine(&c, Duration::from_secs(1));

        assert!(matches!(
            sm.finish_patient(99).await,
            Err(StateMachineError::NotFound { patient_id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_stale_version_is_concurrent_modification() {
        let c = TestCollaborators::new([patient(1, PatientStatus::Pending, None)]);
        let sm = machine(&c, Duration::from_secs(1));

        let loaded = c.store.get(1).unwrap();
        c.store.touch(1);

        assert!(matches!(
            sm.transition(&loaded, PatientEvent::Finish).await,
            Err(StateMachineError::ConcurrentModification { patient_id: 1 })
        ));
        assert!(c.sink.updates().is_empty());
    }

    #[tokio::test]
    async fn test_status_edits_follow_edge_set() {
        let c = TestCollaborators::new([
            patient(1, PatientStatus::Pending, Some(1)),
            patient(2, PatientStatus::Called, Some(2)),
            patient(3, PatientStatus::Pending, None),
        ]);
        let sm = machine(&c, Duration::from_secs(1));

        let called = sm.apply_status_edit(1, PatientStatus::Call).await.unwrap();
        assert_eq!(called.status, PatientStatus::Called);

        assert!(matches!(
            sm.apply_status_edit(2, PatientStatus::Pending).await,
            Err(StateMachineError::InvalidTransition { .. })
        ));

        assert!(matches!(
            sm.apply_status_edit(3, PatientStatus::Call).await,
            Err(StateMachineError::GuardFailed { .. })
        ));

        let unchanged = sm.apply_status_edit(3, PatientStatus::Pending).await.unwrap();
        assert_eq!(unchanged.version, 0);

        let finished = sm.apply_status_edit(2, PatientStatus::Finished).await.unwrap();
        assert_eq!(finished.status, PatientStatus::Finished);
    }
}
