use thiserror::Error;

use crate::bridge::QueueSourceError;
use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::dispatch::DispatchError;
use crate::models::PatientValidationError;
use crate::state_machine::{GuardError, StateMachineError};

/// Crate-level error, classified by how the reconciliation loop reacts to it
#[derive(Debug, Error)]
pub enum PagientError {
    /// The queue or the patient candidates could not be read; the tick is skipped
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service error: {service} - {reason}")]
    ExternalService { service: String, reason: String },

    #[error("Patient {patient_id} not found")]
    NotFound { patient_id: i64 },

    #[error("Patient {patient_id} was modified concurrently")]
    ConcurrentModification { patient_id: i64 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PagientError {
    pub fn source_read(error: impl std::fmt::Display) -> Self {
        Self::SourceRead(error.to_string())
    }
}

impl From<StoreError> for PagientError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { patient_id } => Self::NotFound { patient_id },
            StoreError::ConcurrentModification { patient_id } => {
                Self::ConcurrentModification { patient_id }
            }
            StoreError::Validation(e) => Self::Validation(e.to_string()),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<StateMachineError> for PagientError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::GuardFailed { reason } => Self::Validation(reason),
            e @ StateMachineError::InvalidTransition { .. } => Self::Validation(e.to_string()),
            StateMachineError::ExternalService { service, reason } => {
                Self::ExternalService { service, reason }
            }
            StateMachineError::NotFound { patient_id } => Self::NotFound { patient_id },
            StateMachineError::ConcurrentModification { patient_id } => {
                Self::ConcurrentModification { patient_id }
            }
            StateMachineError::ValidationFailed { reason } => Self::Validation(reason),
            StateMachineError::PersistenceFailed { reason } => Self::Persistence(reason),
        }
    }
}

impl From<QueueSourceError> for PagientError {
    fn from(err: QueueSourceError) -> Self {
        Self::source_read(err)
    }
}

impl From<DispatchError> for PagientError {
    fn from(err: DispatchError) -> Self {
        Self::ExternalService {
            service: "easy_call".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<GuardError> for PagientError {
    fn from(err: GuardError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PatientValidationError> for PagientError {
    fn from(err: PatientValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ConfigurationError> for PagientError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PagientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_class() {
        assert!(matches!(
            PagientError::from(StoreError::NotFound { patient_id: 3 }),
            PagientError::NotFound { patient_id: 3 }
        ));
        assert!(matches!(
            PagientError::from(StoreError::ConcurrentModification { patient_id: 4 }),
            PagientError::ConcurrentModification { patient_id: 4 }
        ));
        assert!(matches!(
            PagientError::from(StoreError::InvalidData("bad".into())),
            PagientError::Persistence(_)
        ));
    }

    #[test]
    fn test_guard_failure_is_validation() {
        let err: PagientError = StateMachineError::from(GuardError::NoPagerAssigned {
            patient_id: 9,
        })
        .into();
        assert!(matches!(err, PagientError::Validation(_)));
    }

    #[test]
    fn test_invalid_record_through_state_machine_is_validation() {
        let err: PagientError =
            StateMachineError::from(StoreError::Validation(PatientValidationError::InvalidSsn))
                .into();
        assert!(matches!(err, PagientError::Validation(ref reason) if reason.contains("ssn")));
    }

    #[test]
    fn test_source_read_keeps_cause() {
        let err = PagientError::source_read("queue database unreachable");
        assert!(matches!(err, PagientError::SourceRead(_)));
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_dispatch_failure_is_external_service() {
        let err: PagientError = DispatchError::Timeout { timeout_ms: 100 }.into();
        assert!(matches!(err, PagientError::ExternalService { .. }));
    }
}
