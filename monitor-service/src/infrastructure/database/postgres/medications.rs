use chrono::NaiveDate;
use shared::{AppError, AppResult};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_stored;
use crate::domain::models::{DrugCategory, MedicationFlags, MedicationOrder};
use crate::domain::repositories::MedicationRepository;
use crate::infrastructure::database::queries::medications::*;

pub struct PgMedicationRepository {
    pool: PgPool,
}

impl PgMedicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MedicationRow {
    id: Uuid,
    patient_id: Uuid,
    drug_name: String,
    drug_category: String,
    start_date: NaiveDate,
    stop_date: Option<NaiveDate>,
    dose: Option<String>,
    route: Option<String>,
    frequency: Option<String>,
    flags: Json<MedicationFlags>,
    source_system: Option<String>,
    source_id: Option<String>,
}

impl TryFrom<MedicationRow> for MedicationOrder {
    type Error = AppError;

    fn try_from(row: MedicationRow) -> AppResult<Self> {
        Ok(MedicationOrder {
            id: row.id,
            patient_id: row.patient_id,
            drug_name: row.drug_name,
            drug_category: parse_stored::<DrugCategory>(&row.drug_category, "drug category")?,
            start_date: row.start_date,
            stop_date: row.stop_date,
            dose: row.dose,
            route: row.route,
            frequency: row.frequency,
            flags: row.flags.0,
            source_system: row.source_system,
            source_id: row.source_id,
        })
    }
}

fn rows_to_medications(rows: Vec<MedicationRow>) -> AppResult<Vec<MedicationOrder>> {
    rows.into_iter().map(MedicationOrder::try_from).collect()
}

#[async_trait::async_trait]
impl MedicationRepository for PgMedicationRepository {
    async fn insert(&self, medication: &MedicationOrder) -> AppResult<()> {
        sqlx::query(MEDICATION_INSERT)
            .bind(medication.id)
            .bind(medication.patient_id)
            .bind(&medication.drug_name)
            .bind(medication.drug_category.to_string())
            .bind(medication.start_date)
            .bind(medication.stop_date)
            .bind(&medication.dose)
            .bind(&medication.route)
            .bind(&medication.frequency)
            .bind(Json(&medication.flags))
            .bind(&medication.source_system)
            .bind(&medication.source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, medication: &MedicationOrder) -> AppResult<()> {
        let result = sqlx::query(MEDICATION_UPDATE)
            .bind(medication.id)
            .bind(&medication.drug_name)
            .bind(medication.drug_category.to_string())
            .bind(medication.start_date)
            .bind(medication.stop_date)
            .bind(&medication.dose)
            .bind(&medication.route)
            .bind(&medication.frequency)
            .bind(Json(&medication.flags))
            .bind(&medication.source_system)
            .bind(&medication.source_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("medication {}", medication.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MedicationOrder>> {
        let row: Option<MedicationRow> = sqlx::query_as(MEDICATION_FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MedicationOrder::try_from).transpose()
    }

    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MedicationOrder>> {
        let row: Option<MedicationRow> = sqlx::query_as(MEDICATION_FIND_BY_SOURCE)
            .bind(source_system)
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MedicationOrder::try_from).transpose()
    }

    async fn find_natural(
        &self,
        patient_id: Uuid,
        drug_name: &str,
        start_date: NaiveDate,
    ) -> AppResult<Option<MedicationOrder>> {
        let row: Option<MedicationRow> = sqlx::query_as(MEDICATION_FIND_NATURAL)
            .bind(patient_id)
            .bind(drug_name)
            .bind(start_date)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MedicationOrder::try_from).transpose()
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MedicationOrder>> {
        let rows: Vec<MedicationRow> = sqlx::query_as(MEDICATION_LIST_FOR_PATIENT)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_medications(rows)
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MedicationOrder>> {
        let rows: Vec<MedicationRow> = sqlx::query_as(MEDICATION_LIST_ALL)
            .bind(patient_ids.map(<[Uuid]>::to_vec))
            .fetch_all(&self.pool)
            .await?;
        rows_to_medications(rows)
    }
}
