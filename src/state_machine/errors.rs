use thiserror::Error;

use crate::database::StoreError;
use crate::dispatch::DispatchError;

/// Error types for patient state machine operations
#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    /// The paging call failed and the patient was rolled back to `pending`
    #[error("External service error: {service} - {reason}")]
    ExternalService { service: String, reason: String },

    #[error("Patient {patient_id} not found")]
    NotFound { patient_id: i64 },

    #[error("Patient {patient_id} was modified concurrently")]
    ConcurrentModification { patient_id: i64 },

    /// The patient record failed validation before it was written
    #[error("Patient record rejected: {reason}")]
    ValidationFailed { reason: String },

    #[error("Persistence operation failed: {reason}")]
    PersistenceFailed { reason: String },
}

/// Specific error type for guard condition failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Patient {patient_id} has no pager assigned")]
    NoPagerAssigned { patient_id: i64 },
}

impl From<GuardError> for StateMachineError {
    fn from(err: GuardError) -> Self {
        Self::GuardFailed {
            reason: err.to_string(),
        }
    }
}

impl From<StoreError> for StateMachineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { patient_id } => Self::NotFound { patient_id },
            StoreError::ConcurrentModification { patient_id } => {
                Self::ConcurrentModification { patient_id }
            }
            StoreError::Validation(e) => Self::ValidationFailed {
                reason: e.to_string(),
            },
            other => Self::PersistenceFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<DispatchError> for StateMachineError {
    fn from(err: DispatchError) -> Self {
        Self::ExternalService {
            service: "easy_call".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;
