pub mod strategies;

use std::time::Duration;

use pagient_core::reconciliation::ReconciliationPipeline;
use pagient_core::state_machine::PatientStateMachine;
use pagient_core::test_helpers::TestCollaborators;

pub use strategies::*;

pub const ROOM: &str = "WZ1";

/// State machine over the in-memory doubles with a one second dispatch timeout
pub fn state_machine(c: &TestCollaborators) -> PatientStateMachine {
    PatientStateMachine::new(
        c.store.clone(),
        c.dispatcher.clone(),
        c.sink.clone(),
        Duration::from_secs(1),
    )
}

/// Pipeline watching [`ROOM`] without a queue limit
pub fn pipeline(c: &TestCollaborators) -> ReconciliationPipeline {
    ReconciliationPipeline::new(c.store.clone(), c.source.clone(), state_machine(c), ROOM, None)
}
