//! # Test Helpers
//!
//! In-memory doubles for every collaborator of the reconciliation engine, so
//! unit and integration tests run without PostgreSQL or a paging gateway.
//! Each double records what happened to it and can be told to fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bridge::{ExternalQueueSource, QueueSourceError, QueueSourceResult};
use crate::database::{PatientStore, StoreError, StoreResult};
use crate::dispatch::{CallDispatcher, DispatchError, DispatchResult};
use crate::events::NotificationSink;
use crate::models::{Pager, Patient, QueueEntry};
use crate::state_machine::PatientStatus;

/// Pager `n` with receiver number `100 + n`
pub fn pager(n: i64) -> Pager {
    Pager::new(n, format!("P{n}"), 100 + n)
}

/// Valid patient with the given status and, optionally, pager `n`
pub fn patient(id: i64, status: PatientStatus, pager_number: Option<i64>) -> Patient {
    let mut patient = Patient::new(id, format!("{id:010}"), format!("Patient {id}"), 1)
        .with_status(status)
        .with_active(true);
    patient.pager = pager_number.map(pager);
    patient
}

/// Queue in the given order, positions starting at 1
pub fn queue_of(patient_ids: &[i64]) -> Vec<QueueEntry> {
    patient_ids
        .iter()
        .enumerate()
        .map(|(index, id)| QueueEntry::new(*id, index as i64 + 1))
        .collect()
}

/// [`PatientStore`] over a map, with the same version semantics as PostgreSQL
#[derive(Debug, Default)]
pub struct InMemoryPatientStore {
    patients: Mutex<BTreeMap<i64, Patient>>,
    fail_reads: AtomicBool,
    fail_updates_for: Mutex<HashSet<i64>>,
    updates: AtomicUsize,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patients(patients: impl IntoIterator<Item = Patient>) -> Self {
        let store = Self::new();
        for patient in patients {
            store.insert(patient);
        }
        store
    }

    pub fn insert(&self, patient: Patient) {
        self.patients.lock().insert(patient.id, patient);
    }

    pub fn remove(&self, patient_id: i64) -> Option<Patient> {
        self.patients.lock().remove(&patient_id)
    }

    pub fn get(&self, patient_id: i64) -> Option<Patient> {
        self.patients.lock().get(&patient_id).cloned()
    }

    pub fn status_of(&self, patient_id: i64) -> Option<PatientStatus> {
        self.get(patient_id).map(|p| p.status)
    }

    /// Make every `get_by_status` call fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `update` of this patient fail with a database error
    pub fn fail_updates_for(&self, patient_id: i64) {
        self.fail_updates_for.lock().insert(patient_id);
    }

    /// Simulate a concurrent writer by bumping the stored version
    pub fn touch(&self, patient_id: i64) {
        if let Some(patient) = self.patients.lock().get_mut(&patient_id) {
            patient.version += 1;
        }
    }

    /// Successful updates so far
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn get_by_status(&self, statuses: &[PatientStatus]) -> StoreResult<Vec<Patient>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .patients
            .lock()
            .values()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, patient_id: i64) -> StoreResult<Patient> {
        self.get(patient_id)
            .ok_or(StoreError::NotFound { patient_id })
    }

    async fn update(&self, patient: &Patient) -> StoreResult<Patient> {
        patient.validate()?;

        if self.fail_updates_for.lock().contains(&patient.id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut patients = self.patients.lock();
        let stored = patients.get_mut(&patient.id).ok_or(StoreError::NotFound {
            patient_id: patient.id,
        })?;

        if stored.version != patient.version {
            return Err(StoreError::ConcurrentModification {
                patient_id: patient.id,
            });
        }

        let mut next = patient.clone();
        next.version += 1;
        *stored = next.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(next)
    }
}

/// [`ExternalQueueSource`] serving whatever queue the test sets
#[derive(Debug, Default)]
pub struct StaticQueueSource {
    queue: Mutex<Vec<QueueEntry>>,
    failing: AtomicBool,
    reads: AtomicUsize,
    last_limit: Mutex<Option<u32>>,
}

impl StaticQueueSource {
    pub fn new(queue: Vec<QueueEntry>) -> Self {
        Self {
            queue: Mutex::new(queue),
            ..Self::default()
        }
    }

    pub fn set_queue(&self, queue: Vec<QueueEntry>) {
        *self.queue.lock() = queue;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> Option<u32> {
        *self.last_limit.lock()
    }
}

#[async_trait]
impl ExternalQueueSource for StaticQueueSource {
    async fn fetch_queue(
        &self,
        _room_label: &str,
        limit: Option<u32>,
    ) -> QueueSourceResult<Vec<QueueEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.last_limit.lock() = limit;

        if self.failing.load(Ordering::SeqCst) {
            return Err(QueueSourceError::Unavailable(
                "static queue source set to fail".to_string(),
            ));
        }

        let mut queue = self.queue.lock().clone();
        queue.sort_by_key(|entry| entry.position);
        if let Some(limit) = limit {
            queue.truncate(limit as usize);
        }
        Ok(queue)
    }
}

/// [`CallDispatcher`] recording every pager it was asked to page
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    dispatched: Mutex<Vec<i64>>,
    failing_pagers: Mutex<HashSet<i64>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every page sent to this pager id
    pub fn fail_for(&self, pager_id: i64) {
        self.failing_pagers.lock().insert(pager_id);
    }

    /// Accept pages to this pager id again
    pub fn recover(&self, pager_id: i64) {
        self.failing_pagers.lock().remove(&pager_id);
    }

    /// Sleep before answering, to exercise timeouts
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Pager ids in dispatch order, failed attempts included
    pub fn dispatched(&self) -> Vec<i64> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl CallDispatcher for RecordingDispatcher {
    async fn dispatch(&self, pager: &Pager) -> DispatchResult<()> {
        self.dispatched.lock().push(pager.id);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_pagers.lock().contains(&pager.id) {
            return Err(DispatchError::Rejected {
                status: 503,
                body: format!("pager {} unreachable", pager.id),
            });
        }
        Ok(())
    }
}

/// [`NotificationSink`] keeping every update it saw
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<(i64, PatientStatus)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(patient_id, status)` pairs in notification order
    pub fn updates(&self) -> Vec<(i64, PatientStatus)> {
        self.updates.lock().clone()
    }

    pub fn updates_for(&self, patient_id: i64) -> Vec<PatientStatus> {
        self.updates
            .lock()
            .iter()
            .filter(|(id, _)| *id == patient_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify_updated(&self, patient: &Patient) {
        self.updates.lock().push((patient.id, patient.status));
    }
}

/// All doubles wired together, shared through `Arc`
#[derive(Debug, Clone)]
pub struct TestCollaborators {
    pub store: Arc<InMemoryPatientStore>,
    pub source: Arc<StaticQueueSource>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub sink: Arc<RecordingSink>,
}

impl TestCollaborators {
    pub fn new(patients: impl IntoIterator<Item = Patient>) -> Self {
        Self {
            store: Arc::new(InMemoryPatientStore::with_patients(patients)),
            source: Arc::new(StaticQueueSource::default()),
            dispatcher: Arc::new(RecordingDispatcher::new()),
            sink: Arc::new(RecordingSink::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_enforces_versions() {
        let store = InMemoryPatientStore::with_patients([patient(1, PatientStatus::Pending, None)]);
        let loaded = store.get_by_id(1).await.unwrap();

        let saved = store
            .update(&loaded.clone().with_status(PatientStatus::Finished))
            .await
            .unwrap();
        assert_eq!(saved.version, 1);

        let stale = store.update(&loaded).await.unwrap_err();
        assert!(matches!(stale, StoreError::ConcurrentModification { patient_id: 1 }));
    }

    #[tokio::test]
    async fn test_in_memory_store_validates_pager_requirement() {
        let store = InMemoryPatientStore::with_patients([patient(1, PatientStatus::Pending, None)]);
        let loaded = store.get_by_id(1).await.unwrap();
        let err = store
            .update(&loaded.with_status(PatientStatus::Call))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_static_source_applies_limit_in_position_order() {
        let source = StaticQueueSource::new(vec![
            QueueEntry::new(3, 3),
            QueueEntry::new(1, 1),
            QueueEntry::new(2, 2),
        ]);
        let queue = source.fetch_queue("WZ1", Some(2)).await.unwrap();
        assert_eq!(queue, queue_of(&[1, 2]));
        assert_eq!(source.last_limit(), Some(2));
    }

    #[test]
    fn test_fixture_patients_are_valid() {
        assert!(patient(42, PatientStatus::Called, Some(1)).validate().is_ok());
    }
}
