pub mod pager;
pub mod patient;
pub mod queue_entry;

// Re-export core models for easy access
pub use pager::Pager;
pub use patient::{Patient, PatientValidationError};
pub use queue_entry::QueueEntry;
