use proptest::prelude::*;

use pagient_core::state_machine::PatientStatus;

/// Strategy for sorted, distinct patient id sets
pub fn sorted_id_set_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..200, 0..40).prop_map(|ids| ids.into_iter().collect())
}

/// Strategy for sorted id lists that may contain duplicates
pub fn sorted_ids_with_duplicates_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..50, 0..40).prop_map(|mut ids| {
        ids.sort_unstable();
        ids
    })
}

/// Strategy for any patient status
pub fn patient_status_strategy() -> impl Strategy<Value = PatientStatus> {
    prop_oneof![
        Just(PatientStatus::Pending),
        Just(PatientStatus::Call),
        Just(PatientStatus::Called),
        Just(PatientStatus::Finished),
    ]
}

/// Strategy for a population of patients: `(id, status, has_pager)` with distinct ids
pub fn patient_population_strategy() -> impl Strategy<Value = Vec<(i64, PatientStatus, bool)>> {
    prop::collection::btree_map(1i64..100, (patient_status_strategy(), any::<bool>()), 0..30)
        .prop_map(|patients| {
            patients
                .into_iter()
                .map(|(id, (status, has_pager))| (id, status, has_pager))
                .collect()
        })
}

/// Strategy for a queue in arbitrary order, repeats allowed, overlapping the population ids
pub fn shuffled_queue_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..120, 0..40).prop_flat_map(|ids| Just(ids).prop_shuffle())
}

/// Population strategy with the members in arbitrary order
pub fn shuffled_population_strategy() -> impl Strategy<Value = Vec<(i64, PatientStatus, bool)>> {
    patient_population_strategy().prop_flat_map(|members| Just(members).prop_shuffle())
}
