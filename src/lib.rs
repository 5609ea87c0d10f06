#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, EasyCall in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Pagient Core
//!
//! Reconciliation engine for a clinic's patient call-in workflow.
//!
//! ## Overview
//!
//! Patients wait for their examination carrying a pager. A practice-management
//! system owns the ordered waiting queue of each room. This crate polls that
//! queue, pages patients as soon as they show up in the watched slots, and
//! marks them finished once they leave the queue.
//!
//! ## Module Organization
//!
//! - [`reconciliation`] - Snapshot, merge-join reconciler, tick pipeline and poller
//! - [`state_machine`] - Patient lifecycle `pending → call → called → finished`
//! - [`bridge`] - Read-only access to the external waiting queue
//! - [`dispatch`] - Paging through the EasyCall gateway
//! - [`database`] - Patient persistence with optimistic concurrency
//! - [`events`] - Broadcast of patient changes
//! - [`config`] - Layered configuration
//! - [`error`] - Crate-level error classification
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagient_core::config::ConfigManager;
//! use pagient_core::reconciliation::ReconciliationSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let system = ReconciliationSystem::bootstrap(manager.config().clone()).await?;
//! system.start()?;
//! // ... until shutdown
//! system.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit and integration tests run against the in-memory doubles in
//! [`test_helpers`]. PostgreSQL-backed tests are ignored unless
//! `DATABASE_URL` is set:
//!
//! ```bash
//! cargo test                      # In-memory tests
//! cargo test -- --ignored         # PostgreSQL tests
//! cargo bench --features benchmarks
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod reconciliation;
pub mod state_machine;
pub mod test_helpers;

pub use config::{ConfigManager, PagientConfig};
pub use constants::{status_groups, system};
pub use error::{PagientError, Result};
pub use models::{Pager, Patient, QueueEntry};
pub use reconciliation::{ReconciliationSystem, TickReport};
pub use state_machine::{PatientStateMachine, PatientStatus};
