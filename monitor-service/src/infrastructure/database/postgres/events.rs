use chrono::{DateTime, NaiveDate, Utc};
use shared::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_stored;
use crate::domain::models::{AbnormalFlag, MonitoringEvent, ReviewStatus};
use crate::domain::repositories::EventRepository;
use crate::infrastructure::database::queries::events::*;

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    patient_id: Uuid,
    medication_order_id: Option<Uuid>,
    test_type: String,
    performed_date: NaiveDate,
    value: Option<String>,
    unit: Option<String>,
    interpretation: Option<String>,
    attachment_url: Option<String>,
    source_system: String,
    source_id: Option<String>,
    recorded_by: Option<String>,
    abnormal_flag: String,
    abnormal_reason_code: Option<String>,
    reviewed_status: Option<String>,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for MonitoringEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> AppResult<Self> {
        Ok(MonitoringEvent {
            id: row.id,
            patient_id: row.patient_id,
            medication_order_id: row.medication_order_id,
            test_type: row.test_type,
            performed_date: row.performed_date,
            value: row.value,
            unit: row.unit,
            interpretation: row.interpretation,
            attachment_url: row.attachment_url,
            source_system: row.source_system,
            source_id: row.source_id,
            recorded_by: row.recorded_by,
            abnormal_flag: parse_stored::<AbnormalFlag>(&row.abnormal_flag, "abnormal flag")?,
            abnormal_reason_code: row.abnormal_reason_code,
            reviewed_status: row
                .reviewed_status
                .as_deref()
                .map(|s| parse_stored::<ReviewStatus>(s, "review status"))
                .transpose()?,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
        })
    }
}

fn rows_to_events(rows: Vec<EventRow>) -> AppResult<Vec<MonitoringEvent>> {
    rows.into_iter().map(MonitoringEvent::try_from).collect()
}

#[async_trait::async_trait]
impl EventRepository for PgEventRepository {
    async fn insert(&self, event: &MonitoringEvent) -> AppResult<()> {
        sqlx::query(EVENT_INSERT)
            .bind(event.id)
            .bind(event.patient_id)
            .bind(event.medication_order_id)
            .bind(&event.test_type)
            .bind(event.performed_date)
            .bind(&event.value)
            .bind(&event.unit)
            .bind(&event.interpretation)
            .bind(&event.attachment_url)
            .bind(&event.source_system)
            .bind(&event.source_id)
            .bind(&event.recorded_by)
            .bind(event.abnormal_flag.to_string())
            .bind(&event.abnormal_reason_code)
            .bind(event.reviewed_status.map(|s| s.to_string()))
            .bind(&event.reviewed_by)
            .bind(event.reviewed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, event: &MonitoringEvent) -> AppResult<()> {
        let result = sqlx::query(EVENT_UPDATE)
            .bind(event.id)
            .bind(&event.value)
            .bind(&event.unit)
            .bind(&event.interpretation)
            .bind(&event.attachment_url)
            .bind(&event.source_id)
            .bind(event.abnormal_flag.to_string())
            .bind(&event.abnormal_reason_code)
            .bind(event.reviewed_status.map(|s| s.to_string()))
            .bind(&event.reviewed_by)
            .bind(event.reviewed_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("event {}", event.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringEvent>> {
        let row: Option<EventRow> = sqlx::query_as(EVENT_FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringEvent::try_from).transpose()
    }

    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MonitoringEvent>> {
        let row: Option<EventRow> = sqlx::query_as(EVENT_FIND_BY_SOURCE)
            .bind(source_system)
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringEvent::try_from).transpose()
    }

    async fn find_natural(
        &self,
        patient_id: Uuid,
        test_type: &str,
        performed_date: NaiveDate,
    ) -> AppResult<Option<MonitoringEvent>> {
        let row: Option<EventRow> = sqlx::query_as(EVENT_FIND_NATURAL)
            .bind(patient_id)
            .bind(test_type)
            .bind(performed_date)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringEvent::try_from).transpose()
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MonitoringEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(EVENT_LIST_FOR_PATIENT)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;
        rows_to_events(rows)
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MonitoringEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(EVENT_LIST_ALL)
            .bind(patient_ids.map(<[Uuid]>::to_vec))
            .fetch_all(&self.pool)
            .await?;
        rows_to_events(rows)
    }
}
