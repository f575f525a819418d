use chrono::NaiveDate;
use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::MonitoringEvent;

#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &MonitoringEvent) -> AppResult<()>;

    async fn update(&self, event: &MonitoringEvent) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringEvent>>;

    /// Idempotency lookup by upstream identity.
    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MonitoringEvent>>;

    /// Natural-key lookup used to dedup re-ingested rows.
    async fn find_natural(
        &self,
        patient_id: Uuid,
        test_type: &str,
        performed_date: NaiveDate,
    ) -> AppResult<Option<MonitoringEvent>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MonitoringEvent>>;

    /// All events, optionally restricted to a patient set, ordered by
    /// performed date. Used by the export bundle.
    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MonitoringEvent>>;
}
