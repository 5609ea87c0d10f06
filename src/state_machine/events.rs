use serde::{Deserialize, Serialize};

use super::states::PatientStatus;

/// Events that can trigger patient state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PatientEvent {
    /// Request a page for the patient's pager
    Call,
    /// The paging service accepted the page
    DispatchSucceeded,
    /// The paging service failed; roll the request back
    DispatchFailed(String),
    /// Patient left the examination queue
    Finish,
}

impl PatientEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::DispatchSucceeded => "dispatch_succeeded",
            Self::DispatchFailed(_) => "dispatch_failed",
            Self::Finish => "finish",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::DispatchFailed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a dispatch failure event with the given error message
    pub fn dispatch_failed(error: impl Into<String>) -> Self {
        Self::DispatchFailed(error.into())
    }

    /// The complete edge set of the patient lifecycle.
    ///
    /// Returns the target state, or `None` when the edge does not exist.
    pub fn target_from(&self, current: PatientStatus) -> Option<PatientStatus> {
        match (current, self) {
            (PatientStatus::Pending, Self::Call) => Some(PatientStatus::Call),
            (PatientStatus::Call, Self::DispatchSucceeded) => Some(PatientStatus::Called),
            (PatientStatus::Call, Self::DispatchFailed(_)) => Some(PatientStatus::Pending),
            (PatientStatus::Pending | PatientStatus::Call | PatientStatus::Called, Self::Finish) => {
                Some(PatientStatus::Finished)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_edges() {
        assert_eq!(
            PatientEvent::Call.target_from(PatientStatus::Pending),
            Some(PatientStatus::Call)
        );
        assert_eq!(
            PatientEvent::DispatchSucceeded.target_from(PatientStatus::Call),
            Some(PatientStatus::Called)
        );
        assert_eq!(
            PatientEvent::Finish.target_from(PatientStatus::Called),
            Some(PatientStatus::Finished)
        );
    }

    #[test]
    fn test_rollback_edge_only_from_call() {
        let failed = PatientEvent::dispatch_failed("timeout");
        assert_eq!(failed.target_from(PatientStatus::Call), Some(PatientStatus::Pending));
        assert_eq!(failed.target_from(PatientStatus::Called), None);
        assert_eq!(failed.target_from(PatientStatus::Pending), None);
        assert_eq!(failed.error_message(), Some("timeout"));
    }

    #[test]
    fn test_no_edges_leave_finished() {
        for event in [
            PatientEvent::Call,
            PatientEvent::DispatchSucceeded,
            PatientEvent::dispatch_failed("x"),
            PatientEvent::Finish,
        ] {
            assert_eq!(event.target_from(PatientStatus::Finished), None);
        }
    }

    #[test]
    fn test_no_repeat_call() {
        assert_eq!(PatientEvent::Call.target_from(PatientStatus::Call), None);
        assert_eq!(PatientEvent::Call.target_from(PatientStatus::Called), None);
        assert_eq!(PatientEvent::DispatchSucceeded.target_from(PatientStatus::Pending), None);
    }
}
