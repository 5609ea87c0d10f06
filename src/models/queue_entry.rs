use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One room assignment read from the practice-management system.
///
/// `patient_id` is the external patient id, which is also the Pagient
/// patient id. Lower `position` values are seen first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    pub patient_id: i64,
    pub position: i64,
}

impl QueueEntry {
    pub fn new(patient_id: i64, position: i64) -> Self {
        Self {
            patient_id,
            position,
        }
    }
}
