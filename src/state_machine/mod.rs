// Patient lifecycle state machine
//
// pending -> call -> called -> finished, with call -> pending on a failed page
// and pending/call -> finished when the patient leaves the queue early.

pub mod errors;
pub mod events;
pub mod guards;
pub mod patient_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{GuardError, GuardResult, StateMachineError, StateMachineResult};
pub use events::PatientEvent;
pub use guards::{PagerAssignedGuard, StateGuard};
pub use patient_state_machine::PatientStateMachine;
pub use states::PatientStatus;
