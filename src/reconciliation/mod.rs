//! # Reconciliation Engine
//!
//! Correlates the external waiting queue with tracked patients on every
//! tick, pages the patients whose turn has come and finishes the ones who
//! left the queue.
//!
//! ## Key Components
//!
//! - [`snapshot`] - Immutable view of the queue at one tick
//! - [`reconciler`] - Merge-join set algebra producing call-set and finished-set
//! - [`pipeline`] - One tick: read, reconcile, drive the state machine
//! - [`poller`] - Periodic, cancellable driver of the pipeline
//! - [`bootstrap`] - Wiring from configuration

pub mod bootstrap;
pub mod pipeline;
pub mod poller;
pub mod reconciler;
pub mod snapshot;

pub use bootstrap::{ReconciliationSystem, SystemStatus};
pub use pipeline::{ReconciliationPipeline, TickReport};
pub use poller::{PollerHandle, PollerStats, ReconciliationPoller};
pub use reconciler::{merge_intersect, merge_subtract, ReconciliationPlan, Reconciler};
pub use snapshot::Snapshot;
