use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use super::{ExternalQueueSource, QueueSourceResult};
use crate::models::QueueEntry;

/// `pds6_wz` holds one row per waiting patient, `pds6_stwz` names the rooms.
/// A NULL limit returns the whole queue.
const ROOM_ASSIGNMENTS: &str = r#"
    SELECT wz.pid::BIGINT AS patient_id, wz.flgnr::BIGINT AS position
    FROM pds6_wz wz
    JOIN pds6_stwz st ON wz.wzid = st.wzid
    WHERE st.code = $1
    ORDER BY wz.flgnr ASC
    LIMIT $2
"#;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue source reading a PostgreSQL replica of the room assignment tables
#[derive(Debug, Clone)]
pub struct PostgresReplicaSource {
    pool: PgPool,
}

impl PostgresReplicaSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Defer connecting until the first tick, so an unreachable practice
    /// database shows up as a failed read rather than a failed startup
    pub fn connect_lazy(url: &str, max_connections: u32) -> QueueSourceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ExternalQueueSource for PostgresReplicaSource {
    async fn fetch_queue(
        &self,
        room_label: &str,
        limit: Option<u32>,
    ) -> QueueSourceResult<Vec<QueueEntry>> {
        let entries = sqlx::query_as::<_, QueueEntry>(ROOM_ASSIGNMENTS)
            .bind(room_label)
            .bind(limit.map(i64::from))
            .fetch_all(&self.pool)
            .await?;

        debug!(room = %room_label, count = entries.len(), "Read room assignments");
        Ok(entries)
    }
}
