use std::time::Duration;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use super::{ExternalQueueSource, QueueSourceError, QueueSourceResult};
use crate::config::SqlServerSourceConfig;
use crate::models::QueueEntry;

/// Whole queue of a room
const ROOM_ASSIGNMENTS: &str = "\
    SELECT CAST(pds6_wz.PID AS BIGINT) AS patient_id, CAST(pds6_wz.flgnr AS BIGINT) AS position \
    FROM pds6_wz JOIN pds6_stwz ON pds6_wz.wzid = pds6_stwz.wzid \
    WHERE pds6_stwz.code = @P1 \
    ORDER BY pds6_wz.flgnr ASC";

/// First `@P1` entries of a room
const ROOM_ASSIGNMENTS_TOP: &str = "\
    SELECT TOP(@P1) CAST(pds6_wz.PID AS BIGINT) AS patient_id, CAST(pds6_wz.flgnr AS BIGINT) AS position \
    FROM pds6_wz JOIN pds6_stwz ON pds6_wz.wzid = pds6_stwz.wzid \
    WHERE pds6_stwz.code = @P2 \
    ORDER BY pds6_wz.flgnr ASC";

type SqlServerClient = Client<Compat<TcpStream>>;

/// Queue source reading the room assignment tables of the practice database.
///
/// One connection is kept between ticks and dropped after any failed read,
/// so the next tick reconnects.
pub struct SqlServerQueueSource {
    config: Config,
    timeout: Duration,
    client: Mutex<Option<SqlServerClient>>,
}

impl std::fmt::Debug for SqlServerQueueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerQueueSource")
            .field("addr", &self.config.get_addr())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SqlServerQueueSource {
    /// No connection is opened until the first read
    pub fn new(settings: &SqlServerSourceConfig) -> Self {
        Self::with_connection_config(connection_config(settings), settings.timeout())
    }

    pub fn with_connection_config(config: Config, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            client: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> String {
        self.config.get_addr()
    }

    async fn connect(&self) -> QueueSourceResult<SqlServerClient> {
        let addr = self.config.get_addr();
        let tcp = TcpStream::connect(addr.as_str())
            .await
            .map_err(|e| QueueSourceError::Unavailable(format!("connecting to {addr}: {e}")))?;
        tcp.set_nodelay(true)
            .map_err(|e| QueueSourceError::Unavailable(format!("configuring socket to {addr}: {e}")))?;

        let client = Client::connect(self.config.clone(), tcp.compat_write()).await?;
        debug!(addr = %addr, "Connected to practice database");
        Ok(client)
    }

    async fn read(&self, room_label: &str, limit: Option<u32>) -> QueueSourceResult<Vec<QueueEntry>> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let client = guard
            .as_mut()
            .ok_or_else(|| QueueSourceError::Unavailable("no practice database connection".to_string()))?;

        let result = query_room(client, room_label, limit).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

/// Map the configured settings onto a tiberius connection config
pub fn connection_config(settings: &SqlServerSourceConfig) -> Config {
    let mut config = Config::new();
    config.host(&settings.host);
    config.port(settings.port);
    config.database(&settings.database);
    config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
    if settings.encrypt {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }
    config
}

/// `TOP(@P1)` binds the limit ahead of the room code
fn room_assignment_query(limit: Option<u32>) -> &'static str {
    match limit {
        Some(_) => ROOM_ASSIGNMENTS_TOP,
        None => ROOM_ASSIGNMENTS,
    }
}

async fn query_room(
    client: &mut SqlServerClient,
    room_label: &str,
    limit: Option<u32>,
) -> QueueSourceResult<Vec<QueueEntry>> {
    let mut query = Query::new(room_assignment_query(limit));
    if let Some(limit) = limit {
        query.bind(i64::from(limit));
    }
    query.bind(room_label);

    let rows = query.query(client).await?.into_first_result().await?;
    rows.iter().map(queue_entry).collect()
}

fn queue_entry(row: &Row) -> QueueSourceResult<QueueEntry> {
    let patient_id: Option<i64> = row.try_get(0usize)?;
    let position: Option<i64> = row.try_get(1usize)?;
    match (patient_id, position) {
        (Some(patient_id), Some(position)) => Ok(QueueEntry::new(patient_id, position)),
        _ => Err(QueueSourceError::InvalidRow(
            "room assignment without PID or flgnr".to_string(),
        )),
    }
}

#[async_trait]
impl ExternalQueueSource for SqlServerQueueSource {
    async fn fetch_queue(
        &self,
        room_label: &str,
        limit: Option<u32>,
    ) -> QueueSourceResult<Vec<QueueEntry>> {
        let entries = match tokio::time::timeout(self.timeout, self.read(room_label, limit)).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                // The connection may be mid-response; start over next tick
                *self.client.lock().await = None;
                warn!(room = %room_label, timeout_ms = self.timeout.as_millis() as u64, "Room assignment read timed out");
                return Err(QueueSourceError::Unavailable(format!(
                    "room assignment read exceeded {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        debug!(room = %room_label, count = entries.len(), "Read room assignments");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SqlServerSourceConfig {
        SqlServerSourceConfig {
            host: "praxis-db".to_string(),
            port: 1433,
            database: "medical_office".to_string(),
            user: "reader".to_string(),
            password: "reader".to_string(),
            encrypt: false,
            timeout_ms: 500,
        }
    }

    #[test]
    fn test_limit_selects_top_query() {
        assert!(room_assignment_query(Some(3)).contains("TOP(@P1)"));
        assert!(room_assignment_query(Some(3)).contains("code = @P2"));
        assert!(!room_assignment_query(None).contains("TOP"));
        assert!(room_assignment_query(None).contains("code = @P1"));
        for limit in [None, Some(1)] {
            assert!(room_assignment_query(limit).ends_with("ORDER BY pds6_wz.flgnr ASC"));
        }
    }

    #[test]
    fn test_connection_config_uses_host_and_port() {
        let source = SqlServerQueueSource::new(&settings());
        assert_eq!(source.addr(), "praxis-db:1433");
        assert_eq!(source.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_failed_read() {
        let mut unreachable = settings();
        unreachable.host = "127.0.0.1".to_string();
        unreachable.port = 1;
        let source = SqlServerQueueSource::new(&unreachable);

        let err = source.fetch_queue("WZ1", None).await.unwrap_err();
        assert!(matches!(err, QueueSourceError::Unavailable(_)));
        assert!(source.client.lock().await.is_none());
    }

    /// Needs `PAGIENT_TEST_SQLSERVER` holding an ADO connection string
    #[tokio::test]
    #[ignore = "requires SQL Server via PAGIENT_TEST_SQLSERVER"]
    async fn test_reads_room_in_position_order() {
        let ado = std::env::var("PAGIENT_TEST_SQLSERVER").unwrap();
        let config = Config::from_ado_string(&ado).unwrap();
        let source = SqlServerQueueSource::with_connection_config(config.clone(), Duration::from_secs(5));

        let tcp = TcpStream::connect(config.get_addr()).await.unwrap();
        let mut client = Client::connect(config, tcp.compat_write()).await.unwrap();
        client
            .simple_query(
                "IF OBJECT_ID('pds6_wz') IS NOT NULL DROP TABLE pds6_wz; \
                 IF OBJECT_ID('pds6_stwz') IS NOT NULL DROP TABLE pds6_stwz; \
                 CREATE TABLE pds6_stwz (wzid INT PRIMARY KEY, code VARCHAR(10) NOT NULL); \
                 CREATE TABLE pds6_wz (wzjid INT IDENTITY PRIMARY KEY, wzid INT NOT NULL, PID INT NOT NULL, flgnr INT NOT NULL); \
                 INSERT INTO pds6_stwz (wzid, code) VALUES (1, 'WZ1'), (2, 'WZ2'); \
                 INSERT INTO pds6_wz (wzid, PID, flgnr) VALUES (1, 30, 3), (1, 10, 1), (2, 99, 1), (1, 20, 2);",
            )
            .await
            .unwrap()
            .into_results()
            .await
            .unwrap();

        let queue = source.fetch_queue("WZ1", None).await.unwrap();
        assert_eq!(
            queue,
            vec![
                QueueEntry::new(10, 1),
                QueueEntry::new(20, 2),
                QueueEntry::new(30, 3)
            ]
        );

        let capped = source.fetch_queue("WZ1", Some(2)).await.unwrap();
        assert_eq!(capped, vec![QueueEntry::new(10, 1), QueueEntry::new(20, 2)]);
        assert!(source.fetch_queue("WZ9", Some(2)).await.unwrap().is_empty());
    }
}
