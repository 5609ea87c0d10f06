pub mod publisher;

use crate::models::Patient;

pub use publisher::{PatientEventKind, PatientEventPublisher, PublishedPatientEvent};

/// Receives every patient change made by the reconciliation engine.
///
/// Implementations must not block; they are called inline after each
/// successful persist.
pub trait NotificationSink: Send + Sync {
    fn notify_updated(&self, patient: &Patient);
}
