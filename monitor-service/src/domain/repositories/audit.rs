use shared::{AppResult, AuditRecord};

#[async_trait::async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> AppResult<()>;
}
