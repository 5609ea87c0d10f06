//! # Patient Store
//!
//! The narrow repository contract the reconciliation engine consumes, and its
//! PostgreSQL implementation. Every call runs in its own statement-level
//! transaction; there is no cross-call locking. Concurrent writers are detected
//! through the `version` column instead.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use crate::models::{Pager, Patient};
use crate::state_machine::PatientStatus;

/// Repository contract for patient records
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// All patients whose status is one of `statuses`, ascending by id
    async fn get_by_status(&self, statuses: &[PatientStatus]) -> StoreResult<Vec<Patient>>;

    /// A single patient, or [`StoreError::NotFound`]
    async fn get_by_id(&self, patient_id: i64) -> StoreResult<Patient>;

    /// Persist `patient` if its `version` still matches the stored row.
    ///
    /// Returns the stored patient with the bumped version.
    async fn update(&self, patient: &Patient) -> StoreResult<Patient>;
}

const SELECT_PATIENT: &str = r#"
    SELECT p.id, p.ssn, p.name, p.client_id, p.status, p.active, p.version,
           pg.id AS pager_id, pg.name AS pager_name, pg.easy_call_id AS pager_easy_call_id
    FROM patients p
    LEFT JOIN pagers pg ON pg.id = p.pager_id
"#;

const UPDATE_PATIENT: &str = r#"
    WITH updated AS (
        UPDATE patients
        SET ssn = $2, name = $3, pager_id = $4, client_id = $5,
            status = $6, active = $7, version = version + 1
        WHERE id = $1 AND version = $8
        RETURNING id, ssn, name, pager_id, client_id, status, active, version
    )
    SELECT u.id, u.ssn, u.name, u.client_id, u.status, u.active, u.version,
           pg.id AS pager_id, pg.name AS pager_name, pg.easy_call_id AS pager_easy_call_id
    FROM updated u
    LEFT JOIN pagers pg ON pg.id = u.pager_id
"#;

/// Flat row shape of a patient joined with its pager
#[derive(Debug, FromRow)]
struct PatientRow {
    id: i64,
    ssn: String,
    name: String,
    client_id: i64,
    status: String,
    active: bool,
    version: i64,
    pager_id: Option<i64>,
    pager_name: Option<String>,
    pager_easy_call_id: Option<i64>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = StoreError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<PatientStatus>()
            .map_err(StoreError::InvalidData)?;

        let pager = match (row.pager_id, row.pager_name, row.pager_easy_call_id) {
            (Some(id), Some(name), Some(easy_call_id)) => Some(Pager {
                id,
                name,
                easy_call_id,
            }),
            (None, _, _) => None,
            (Some(id), _, _) => {
                return Err(StoreError::InvalidData(format!(
                    "pager {id} of patient {} is incomplete",
                    row.id
                )))
            }
        };

        Ok(Patient {
            id: row.id,
            ssn: row.ssn.trim_end().to_string(),
            name: row.name,
            pager,
            client_id: row.client_id,
            status,
            active: row.active,
            version: row.version,
        })
    }
}

/// PostgreSQL-backed [`PatientStore`]
#[derive(Debug, Clone)]
pub struct PgPatientStore {
    pool: PgPool,
}

impl PgPatientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, patient_id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1)")
            .bind(patient_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl PatientStore for PgPatientStore {
    async fn get_by_status(&self, statuses: &[PatientStatus]) -> StoreResult<Vec<Patient>> {
        let states: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!("{SELECT_PATIENT} WHERE p.status = ANY($1) ORDER BY p.id ASC");

        let rows = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(&states)
            .fetch_all(&self.pool)
            .await?;

        debug!(statuses = ?states, count = rows.len(), "Loaded patients by status");

        rows.into_iter().map(Patient::try_from).collect()
    }

    async fn get_by_id(&self, patient_id: i64) -> StoreResult<Patient> {
        let sql = format!("{SELECT_PATIENT} WHERE p.id = $1");

        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Patient::try_from(row),
            None => Err(StoreError::NotFound { patient_id }),
        }
    }

    async fn update(&self, patient: &Patient) -> StoreResult<Patient> {
        patient.validate()?;

        let row = sqlx::query_as::<_, PatientRow>(UPDATE_PATIENT)
            .bind(patient.id)
            .bind(&patient.ssn)
            .bind(&patient.name)
            .bind(patient.pager_id())
            .bind(patient.client_id)
            .bind(patient.status.as_str())
            .bind(patient.active)
            .bind(patient.version)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Patient::try_from(row),
            None if self.exists(patient.id).await? => Err(StoreError::ConcurrentModification {
                patient_id: patient.id,
            }),
            None => Err(StoreError::NotFound {
                patient_id: patient.id,
            }),
        }
    }
}
