use super::errors::{GuardError, GuardResult};
use super::states::PatientStatus;
use crate::models::Patient;

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if moving `entity` into `target` is allowed
    fn check(&self, entity: &T, target: PatientStatus) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Paging states need a pager to page
pub struct PagerAssignedGuard;

impl StateGuard<Patient> for PagerAssignedGuard {
    fn check(&self, patient: &Patient, target: PatientStatus) -> GuardResult<()> {
        if target.is_paging() && !patient.has_pager() {
            return Err(GuardError::NoPagerAssigned {
                patient_id: patient.id,
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Patient must have a pager assigned to be called"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pager;

    fn patient() -> Patient {
        Patient::new(1, "1234567890", "John Doe", 1)
    }

    #[test]
    fn test_pager_required_for_paging_states() {
        let guard = PagerAssignedGuard;
        assert_eq!(
            guard.check(&patient(), PatientStatus::Call),
            Err(GuardError::NoPagerAssigned { patient_id: 1 })
        );
        assert!(guard
            .check(&patient().with_pager(Pager::new(1, "P1", 101)), PatientStatus::Call)
            .is_ok());
    }

    #[test]
    fn test_pager_not_required_for_finishing() {
        assert!(PagerAssignedGuard
            .check(&patient(), PatientStatus::Finished)
            .is_ok());
    }
}
