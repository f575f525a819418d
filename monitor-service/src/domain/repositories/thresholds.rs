use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::ReferenceThreshold;

#[async_trait::async_trait]
pub trait ThresholdRepository: Send + Sync {
    async fn upsert(&self, threshold: &ReferenceThreshold) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReferenceThreshold>>;

    /// Enabled thresholds for one monitoring type.
    async fn enabled_for_type(&self, monitoring_type: &str)
        -> AppResult<Vec<ReferenceThreshold>>;
}
