use chrono::NaiveDate;
use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::MedicationOrder;

#[async_trait::async_trait]
pub trait MedicationRepository: Send + Sync {
    async fn insert(&self, medication: &MedicationOrder) -> AppResult<()>;

    async fn update(&self, medication: &MedicationOrder) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MedicationOrder>>;

    /// Idempotency lookup by upstream identity.
    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MedicationOrder>>;

    /// Natural-key lookup used when no source identity accompanies a row.
    async fn find_natural(
        &self,
        patient_id: Uuid,
        drug_name: &str,
        start_date: NaiveDate,
    ) -> AppResult<Option<MedicationOrder>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MedicationOrder>>;

    /// All medication orders, optionally restricted to a patient set,
    /// ordered by start date. Used by the export bundle.
    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MedicationOrder>>;
}
