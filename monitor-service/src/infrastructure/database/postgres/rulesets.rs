use chrono::{DateTime, NaiveDate, Utc};
use shared::AppResult;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::models::{Ruleset, RulesetVersion};
use crate::domain::repositories::RulesetRepository;
use crate::infrastructure::database::queries::rulesets::*;

pub struct PgRulesetRepository {
    pool: PgPool,
}

impl PgRulesetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RulesetRow {
    id: Uuid,
    version: String,
    effective_from: NaiveDate,
    rules_json: Json<Ruleset>,
    created_at: DateTime<Utc>,
}

impl From<RulesetRow> for RulesetVersion {
    fn from(row: RulesetRow) -> Self {
        RulesetVersion {
            id: row.id,
            version: row.version,
            effective_from: row.effective_from,
            rules: row.rules_json.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait::async_trait]
impl RulesetRepository for PgRulesetRepository {
    async fn insert_version(&self, version: &RulesetVersion) -> AppResult<()> {
        sqlx::query(RULESET_INSERT)
            .bind(version.id)
            .bind(&version.version)
            .bind(version.effective_from)
            .bind(Json(&version.rules))
            .bind(version.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest(&self) -> AppResult<Option<RulesetVersion>> {
        let row: Option<RulesetRow> = sqlx::query_as(RULESET_LATEST)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RulesetVersion::from))
    }
}
