//! # Database Operations
//!
//! Patient persistence for the reconciliation engine.
//!
//! ## Key Components
//!
//! - [`connection`] - PostgreSQL pool management
//! - [`migrator`] - Schema migrations for patients, pagers and clients
//! - [`patient_store`] - The [`PatientStore`] contract and its PostgreSQL implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pagient_core::database::{PatientStore, PgPatientStore};
//! use pagient_core::state_machine::PatientStatus;
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let store = PgPatientStore::new(pool);
//! let waiting = store.get_by_status(&[PatientStatus::Pending]).await?;
//! println!("{} patients waiting", waiting.len());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod errors;
pub mod migrator;
pub mod patient_store;

pub use connection::{connect_pool, DatabaseConnection};
pub use errors::{StoreError, StoreResult};
pub use patient_store::{PatientStore, PgPatientStore};
