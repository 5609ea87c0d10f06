//! # Database Migration Support
//!
//! ## Usage
//!
//! ```rust,ignore
//! #[sqlx::test(migrator = "pagient_core::database::migrator::MIGRATOR")]
//! async fn test_something(pool: PgPool) { /* ... */ }
//! ```

use sqlx::PgPool;
use tracing::info;

/// Migrator for the patient/pager/client schema in `migrations/`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running patient database migrations");
    MIGRATOR.run(pool).await?;
    info!("Patient database migrations complete");
    Ok(())
}
