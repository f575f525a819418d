use chrono::{DateTime, Utc};
use shared::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::models::{Patient, RiskFlags};
use crate::domain::repositories::PatientRepository;
use crate::infrastructure::database::queries::patients::*;

pub struct PgPatientRepository {
    pool: PgPool,
}

impl PgPatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    pseudonym: String,
    sex: Option<String>,
    age_band: Option<String>,
    ethnicity: Option<String>,
    service: Option<String>,
    ecg_indicated: Option<bool>,
    cv_risk_present: Option<bool>,
    family_history_cvd: Option<bool>,
    inpatient_admission: Option<bool>,
    attested_by: Option<String>,
    attested_at: Option<DateTime<Utc>>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        // The LEFT JOIN yields all-null flag columns when no flag row
        // exists; any present boolean means the row is there.
        let risk_flags = row.ecg_indicated.map(|ecg_indicated| RiskFlags {
            ecg_indicated,
            cv_risk_present: row.cv_risk_present.unwrap_or(false),
            family_history_cvd: row.family_history_cvd.unwrap_or(false),
            inpatient_admission: row.inpatient_admission.unwrap_or(false),
            attested_by: row.attested_by,
            attested_at: row.attested_at,
        });
        Patient {
            id: row.id,
            pseudonym: row.pseudonym,
            sex: row.sex,
            age_band: row.age_band,
            ethnicity: row.ethnicity,
            service: row.service,
            risk_flags,
        }
    }
}

#[async_trait::async_trait]
impl PatientRepository for PgPatientRepository {
    async fn insert(&self, patient: &Patient) -> AppResult<()> {
        sqlx::query(PATIENT_INSERT)
            .bind(patient.id)
            .bind(&patient.pseudonym)
            .bind(&patient.sex)
            .bind(&patient.age_band)
            .bind(&patient.ethnicity)
            .bind(&patient.service)
            .execute(&self.pool)
            .await?;
        if let Some(flags) = &patient.risk_flags {
            self.upsert_risk_flags(patient.id, flags).await?;
        }
        Ok(())
    }

    async fn update(&self, patient: &Patient) -> AppResult<()> {
        let result = sqlx::query(PATIENT_UPDATE)
            .bind(patient.id)
            .bind(&patient.sex)
            .bind(&patient.age_band)
            .bind(&patient.ethnicity)
            .bind(&patient.service)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("patient {}", patient.id)));
        }
        if let Some(flags) = &patient.risk_flags {
            self.upsert_risk_flags(patient.id, flags).await?;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT_WITH_FLAGS} WHERE p.id = $1");
        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Patient::from))
    }

    async fn find_by_pseudonym(&self, pseudonym: &str) -> AppResult<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT_WITH_FLAGS} WHERE p.pseudonym = $1");
        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(pseudonym)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Patient::from))
    }

    async fn upsert_risk_flags(&self, patient_id: Uuid, flags: &RiskFlags) -> AppResult<()> {
        sqlx::query(RISK_FLAGS_UPSERT)
            .bind(Uuid::new_v4())
            .bind(patient_id)
            .bind(flags.ecg_indicated)
            .bind(flags.cv_risk_present)
            .bind(flags.family_history_cvd)
            .bind(flags.inpatient_admission)
            .bind(&flags.attested_by)
            .bind(flags.attested_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<Patient>> {
        let sql = format!(
            "{PATIENT_SELECT_WITH_FLAGS} WHERE ($1::uuid[] IS NULL OR p.id = ANY($1)) ORDER BY p.pseudonym ASC"
        );
        let rows: Vec<PatientRow> = sqlx::query_as(&sql)
            .bind(patient_ids.map(<[Uuid]>::to_vec))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Patient::from).collect())
    }

    async fn track_patient(
        &self,
        patient_id: Uuid,
        source_system: &str,
        requested_by: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(TRACKED_PATIENT_UPSERT)
            .bind(Uuid::new_v4())
            .bind(patient_id)
            .bind(source_system)
            .bind(requested_by)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tracked_patient_ids(&self) -> AppResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(TRACKED_PATIENT_IDS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
