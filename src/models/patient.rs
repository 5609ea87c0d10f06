use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pager::Pager;
use crate::constants::status_groups;
use crate::state_machine::PatientStatus;

/// Validation failures for patient records
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatientValidationError {
    #[error("ssn: must be exactly 10 digits")]
    InvalidSsn,

    #[error("name: length must be between 1 and 100")]
    InvalidName,

    #[error("status: \"{status}\" can only be set if a pager is assigned")]
    PagerRequired { status: PatientStatus },
}

/// Patient waiting for an examination
///
/// The pager is joined onto the patient when loaded from the store, so the
/// paging flow never needs a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub ssn: String,
    pub name: String,
    pub pager: Option<Pager>,
    pub client_id: i64,
    pub status: PatientStatus,
    pub active: bool,
    /// Optimistic concurrency token, bumped by every successful update
    pub version: i64,
}

impl Patient {
    /// Create a pending, inactive patient without a pager
    pub fn new(id: i64, ssn: impl Into<String>, name: impl Into<String>, client_id: i64) -> Self {
        Self {
            id,
            ssn: ssn.into(),
            name: name.into(),
            pager: None,
            client_id,
            status: PatientStatus::Pending,
            active: false,
            version: 0,
        }
    }

    pub fn with_pager(mut self, pager: Pager) -> Self {
        self.pager = Some(pager);
        self
    }

    pub fn with_status(mut self, status: PatientStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn has_pager(&self) -> bool {
        self.pager.is_some()
    }

    pub fn pager_id(&self) -> Option<i64> {
        self.pager.as_ref().map(|p| p.id)
    }

    /// Validate the record before it is persisted
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        if self.ssn.len() != 10 || !self.ssn.chars().all(|c| c.is_ascii_digit()) {
            return Err(PatientValidationError::InvalidSsn);
        }

        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > 100 {
            return Err(PatientValidationError::InvalidName);
        }

        if self.pager.is_none() && status_groups::PAGER_REQUIRED_STATES.contains(&self.status) {
            return Err(PatientValidationError::PagerRequired {
                status: self.status,
            });
        }

        Ok(())
    }
}
