//! Set algebra over patient ids.
//!
//! Both sides of every operation are sorted ascending and combined with a
//! single linear merge, so the cost stays `O(n + m)` however long the
//! external queue gets.

use std::cmp::Ordering;

use super::snapshot::Snapshot;
use crate::constants::status_groups;
use crate::models::Patient;

/// Ids present in both inputs. Inputs must be sorted ascending.
pub fn merge_intersect(left: &[i64], right: &[i64]) -> Vec<i64> {
    let mut result = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                push_distinct(&mut result, left[i]);
                i += 1;
                j += 1;
            }
        }
    }

    result
}

/// Ids of `left` absent from `right`. Inputs must be sorted ascending.
pub fn merge_subtract(left: &[i64], right: &[i64]) -> Vec<i64> {
    let mut result = Vec::with_capacity(left.len());
    let (mut i, mut j) = (0, 0);

    while i < left.len() {
        if j >= right.len() {
            push_distinct(&mut result, left[i]);
            i += 1;
            continue;
        }
        match left[i].cmp(&right[j]) {
            Ordering::Less => {
                push_distinct(&mut result, left[i]);
                i += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Equal => i += 1,
        }
    }

    result
}

fn push_distinct(result: &mut Vec<i64>, id: i64) {
    if result.last() != Some(&id) {
        result.push(id);
    }
}

fn sorted_ids_where(patients: &[Patient], keep: impl Fn(&Patient) -> bool) -> Vec<i64> {
    let mut ids: Vec<i64> = patients.iter().filter(|p| keep(p)).map(|p| p.id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// The two decisions of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Pending patients with a pager who are in the queue now
    pub call: Vec<i64>,
    /// Active patients who were in the previous queue but not the current one
    pub finished: Vec<i64>,
}

/// Pure computation of call-set and finished-set
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    /// Pending patients holding a pager, intersected with the current queue
    pub fn call_set(candidates: &[Patient], current: &Snapshot) -> Vec<i64> {
        let callable = sorted_ids_where(candidates, |p| {
            status_groups::CALL_CANDIDATE_STATES.contains(&p.status) && p.has_pager()
        });
        merge_intersect(&callable, current.sorted_ids())
    }

    /// Patients who left the queue since `previous`, restricted to
    /// `pending`, `call` and `called`. Empty without a previous snapshot.
    pub fn finished_set(
        candidates: &[Patient],
        previous: Option<&Snapshot>,
        current: &Snapshot,
    ) -> Vec<i64> {
        let Some(previous) = previous else {
            return Vec::new();
        };

        let removed = merge_subtract(previous.sorted_ids(), current.sorted_ids());
        let active = sorted_ids_where(candidates, |p| {
            status_groups::FINISH_CANDIDATE_STATES.contains(&p.status)
        });
        merge_intersect(&removed, &active)
    }

    pub fn plan(
        candidates: &[Patient],
        previous: Option<&Snapshot>,
        current: &Snapshot,
    ) -> ReconciliationPlan {
        ReconciliationPlan {
            call: Self::call_set(candidates, current),
            finished: Self::finished_set(candidates, previous, current),
        }
    }
}
