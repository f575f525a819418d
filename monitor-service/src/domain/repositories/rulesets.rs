use shared::AppResult;

use crate::domain::models::RulesetVersion;

#[async_trait::async_trait]
pub trait RulesetRepository: Send + Sync {
    async fn insert_version(&self, version: &RulesetVersion) -> AppResult<()>;

    /// The newest version by creation timestamp.
    async fn latest(&self) -> AppResult<Option<RulesetVersion>>;
}
