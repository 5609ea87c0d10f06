use thiserror::Error;

use crate::models::PatientValidationError;

/// Errors raised by a [`PatientStore`](super::PatientStore)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Patient {patient_id} not found")]
    NotFound { patient_id: i64 },

    /// The stored version no longer matches the version the caller read
    #[error("Concurrent modification detected for patient {patient_id}")]
    ConcurrentModification { patient_id: i64 },

    #[error("Invalid patient record: {0}")]
    Validation(#[from] PatientValidationError),

    #[error("Invalid data in patient row: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
