use shared::{AppResult, AuditRecord};
use sqlx::PgPool;

use crate::domain::repositories::AuditRepository;
use crate::infrastructure::database::queries::audit::AUDIT_INSERT;

pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditRepository for PgAuditRepository {
    async fn record(&self, record: &AuditRecord) -> AppResult<()> {
        sqlx::query(AUDIT_INSERT)
            .bind(record.id)
            .bind(&record.actor)
            .bind(record.action.to_string())
            .bind(&record.entity_type)
            .bind(&record.entity_id)
            .bind(&record.request_id)
            .bind(&record.ip_address)
            .bind(&record.details)
            .bind(record.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
