use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use super::NotificationSink;
use crate::constants::{events, system};
use crate::models::Patient;

/// What happened to the patient record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientEventKind {
    Created,
    Updated,
    Deleted,
}

impl PatientEventKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Created => events::PATIENT_CREATED,
            Self::Updated => events::PATIENT_UPDATED,
            Self::Deleted => events::PATIENT_DELETED,
        }
    }
}

/// Event that has been published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPatientEvent {
    pub kind: PatientEventKind,
    pub patient: Patient,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Fan-out publisher for patient record changes.
///
/// Publishing never blocks. With no subscribers the event is dropped, and a
/// subscriber that falls more than `capacity` events behind loses the oldest.
#[derive(Debug, Clone)]
pub struct PatientEventPublisher {
    sender: broadcast::Sender<PublishedPatientEvent>,
}

impl PatientEventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, kind: PatientEventKind, patient: &Patient) {
        let event = PublishedPatientEvent {
            kind,
            patient: patient.clone(),
            published_at: chrono::Utc::now(),
        };

        // An error here only means nobody is listening
        if self.sender.send(event).is_err() {
            trace!(
                event = kind.event_name(),
                patient_id = patient.id,
                "No subscribers for patient event"
            );
        }
    }

    pub fn publish_created(&self, patient: &Patient) {
        self.publish(PatientEventKind::Created, patient);
    }

    pub fn publish_deleted(&self, patient: &Patient) {
        self.publish(PatientEventKind::Deleted, patient);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedPatientEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationSink for PatientEventPublisher {
    fn notify_updated(&self, patient: &Patient) {
        self.publish(PatientEventKind::Updated, patient);
    }
}

impl Default for PatientEventPublisher {
    fn default() -> Self {
        Self::new(system::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    fn patient(id: i64) -> Patient {
        Patient::new(id, "1234567890", "Jane Roe", 1)
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let publisher = PatientEventPublisher::new(4);
        publisher.notify_updated(&patient(1));
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates_in_order() {
        let publisher = PatientEventPublisher::new(4);
        let mut rx = publisher.subscribe();

        publisher.publish_created(&patient(1));
        publisher.notify_updated(&patient(1));
        publisher.publish_deleted(&patient(1));

        assert_eq!(rx.recv().await.unwrap().kind, PatientEventKind::Created);
        let updated = rx.recv().await.unwrap();
        assert_eq!(updated.kind, PatientEventKind::Updated);
        assert_eq!(updated.patient.id, 1);
        assert_eq!(rx.recv().await.unwrap().kind, PatientEventKind::Deleted);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_oldest() {
        let publisher = PatientEventPublisher::new(2);
        let mut rx = publisher.subscribe();

        for id in 1..=4 {
            publisher.notify_updated(&patient(id));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().patient.id, 3);
        assert_eq!(rx.recv().await.unwrap().patient.id, 4);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PatientEventKind::Updated.event_name(), "patient.updated");
    }
}
