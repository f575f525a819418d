use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::{Patient, RiskFlags};

#[async_trait::async_trait]
pub trait PatientRepository: Send + Sync {
    async fn insert(&self, patient: &Patient) -> AppResult<()>;

    async fn update(&self, patient: &Patient) -> AppResult<()>;

    /// Loaded with risk flags attached when present.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>>;

    async fn find_by_pseudonym(&self, pseudonym: &str) -> AppResult<Option<Patient>>;

    async fn upsert_risk_flags(&self, patient_id: Uuid, flags: &RiskFlags) -> AppResult<()>;

    /// All patients, optionally restricted to an id set, ordered by
    /// pseudonym. Used by the export bundle.
    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<Patient>>;

    /// Bump the on-demand fetch counter for a patient, creating the
    /// tracking row on first request.
    async fn track_patient(
        &self,
        patient_id: Uuid,
        source_system: &str,
        requested_by: Option<&str>,
    ) -> AppResult<()>;

    async fn tracked_patient_ids(&self) -> AppResult<Vec<Uuid>>;
}
