//! # External Queue Bridge
//!
//! Read-only access to the practice-management system's waiting queue. The
//! reconciliation loop only ever sees an ordered list of [`QueueEntry`]
//! values; where they come from is selected by `bridge.source.kind`.
//!
//! ## Key Components
//!
//! - [`ExternalQueueSource`] - The seam the reconciliation pipeline reads through
//! - [`SqlServerQueueSource`] - Room assignment tables of the practice database
//! - [`PostgresReplicaSource`] - The same tables replicated into PostgreSQL
//! - [`HttpQueueSource`] - A JSON endpoint serving the queue of a room

pub mod http_source;
pub mod postgres_replica;
pub mod sql_server;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::QueueSourceConfig;
use crate::models::QueueEntry;

pub use http_source::HttpQueueSource;
pub use postgres_replica::PostgresReplicaSource;
pub use sql_server::SqlServerQueueSource;

#[derive(Debug, Error)]
pub enum QueueSourceError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Practice database error: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    #[error("Invalid queue row: {0}")]
    InvalidRow(String),

    #[error("Queue endpoint error: {0}")]
    Http(String),

    #[error("Queue endpoint returned status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Queue source unavailable: {0}")]
    Unavailable(String),
}

pub type QueueSourceResult<T> = Result<T, QueueSourceError>;

/// Ordered, read-only view of the waiting queue of one room
#[async_trait]
pub trait ExternalQueueSource: Send + Sync {
    /// Entries of `room_label`, ascending by position, at most `limit` of them.
    ///
    /// Returns an error when the source cannot be read; the caller must not
    /// mistake that for an empty queue.
    async fn fetch_queue(
        &self,
        room_label: &str,
        limit: Option<u32>,
    ) -> QueueSourceResult<Vec<QueueEntry>>;
}

/// Build the configured queue source variant
pub fn build_queue_source(config: &QueueSourceConfig) -> QueueSourceResult<Arc<dyn ExternalQueueSource>> {
    match config {
        QueueSourceConfig::SqlServer(settings) => Ok(Arc::new(SqlServerQueueSource::new(settings))),
        QueueSourceConfig::Postgres {
            url,
            max_connections,
        } => Ok(Arc::new(PostgresReplicaSource::connect_lazy(
            url,
            *max_connections,
        )?)),
        QueueSourceConfig::Http { url, timeout_ms } => {
            Ok(Arc::new(HttpQueueSource::new(url, *timeout_ms)?))
        }
    }
}
