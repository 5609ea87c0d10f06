//! # System Constants
//!
//! Core constants that define the operational boundaries of the Pagient
//! reconciliation engine: status groups used by the poller queries, event
//! names published to subscribers, and system defaults.

// Re-export state type for convenience
pub use crate::state_machine::PatientStatus;

/// Patient lifecycle events published to notification subscribers
pub mod events {
    pub const PATIENT_CREATED: &str = "patient.created";
    pub const PATIENT_UPDATED: &str = "patient.updated";
    pub const PATIENT_DELETED: &str = "patient.deleted";
}

/// System-wide defaults
pub mod system {
    /// Version string reported in startup logs
    pub const PAGIENT_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Default interval between two reconciliation ticks
    pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5_000;

    /// Default upper bound for a single paging call
    pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 10_000;

    /// Default upper bound for a single HTTP queue read
    pub const DEFAULT_QUEUE_SOURCE_TIMEOUT_MS: u64 = 5_000;

    /// Default capacity of the patient notification channel
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

    /// Message body sent with every page; the pagers only vibrate
    pub const DEFAULT_PAGE_MESSAGE: &str = "";
}

/// Status groups used when selecting reconciliation candidates
pub mod status_groups {
    use super::PatientStatus;

    /// Patients that may be paged when they show up in the queue
    pub const CALL_CANDIDATE_STATES: &[PatientStatus] = &[PatientStatus::Pending];

    /// Patients that may be finished once they leave the queue
    pub const FINISH_CANDIDATE_STATES: &[PatientStatus] = &[
        PatientStatus::Pending,
        PatientStatus::Call,
        PatientStatus::Called,
    ];

    /// States that require an assigned pager
    pub const PAGER_REQUIRED_STATES: &[PatientStatus] = &[PatientStatus::Call, PatientStatus::Called];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_candidates_are_a_subset_of_finish_candidates() {
        for status in status_groups::CALL_CANDIDATE_STATES {
            assert!(status_groups::FINISH_CANDIDATE_STATES.contains(status));
        }
    }

    #[test]
    fn test_finished_is_never_a_candidate() {
        assert!(!status_groups::CALL_CANDIDATE_STATES.contains(&PatientStatus::Finished));
        assert!(!status_groups::FINISH_CANDIDATE_STATES.contains(&PatientStatus::Finished));
    }
}
