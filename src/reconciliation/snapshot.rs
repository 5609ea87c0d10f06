use chrono::{DateTime, Utc};

use crate::models::QueueEntry;

/// The waiting queue as observed at one tick.
///
/// Immutable once captured. Besides the entries in position order it keeps
/// the patient ids sorted and deduplicated, ready for merge-joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<QueueEntry>,
    sorted_ids: Vec<i64>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(mut entries: Vec<QueueEntry>) -> Self {
        entries.sort_by_key(|entry| entry.position);

        let mut sorted_ids: Vec<i64> = entries.iter().map(|entry| entry.patient_id).collect();
        sorted_ids.sort_unstable();
        sorted_ids.dedup();

        Self {
            entries,
            sorted_ids,
            captured_at: Utc::now(),
        }
    }

    /// Distinct patient ids, ascending
    pub fn sorted_ids(&self) -> &[i64] {
        &self.sorted_ids
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
