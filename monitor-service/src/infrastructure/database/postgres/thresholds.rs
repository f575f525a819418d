use shared::{AppError, AppResult};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_stored;
use crate::domain::models::{ComparatorType, ReferenceThreshold};
use crate::domain::repositories::ThresholdRepository;
use crate::infrastructure::database::queries::thresholds::*;

pub struct PgThresholdRepository {
    pool: PgPool,
}

impl PgThresholdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ThresholdRow {
    id: Uuid,
    monitoring_type: String,
    unit: String,
    comparator_type: String,
    sex: Option<String>,
    age_band: Option<String>,
    source_system_scope: Option<String>,
    low_critical: Option<f64>,
    low_warning: Option<f64>,
    high_warning: Option<f64>,
    high_critical: Option<f64>,
    coded_abnormal_values: Option<Json<Vec<String>>>,
    enabled: bool,
    version: Option<String>,
    updated_by: Option<String>,
}

impl TryFrom<ThresholdRow> for ReferenceThreshold {
    type Error = AppError;

    fn try_from(row: ThresholdRow) -> AppResult<Self> {
        Ok(ReferenceThreshold {
            id: row.id,
            monitoring_type: row.monitoring_type,
            unit: row.unit,
            comparator_type: parse_stored::<ComparatorType>(
                &row.comparator_type,
                "comparator type",
            )?,
            sex: row.sex,
            age_band: row.age_band,
            source_system_scope: row.source_system_scope,
            low_critical: row.low_critical,
            low_warning: row.low_warning,
            high_warning: row.high_warning,
            high_critical: row.high_critical,
            coded_abnormal_values: row.coded_abnormal_values.map(|j| j.0).unwrap_or_default(),
            enabled: row.enabled,
            version: row.version,
            updated_by: row.updated_by,
        })
    }
}

#[async_trait::async_trait]
impl ThresholdRepository for PgThresholdRepository {
    async fn upsert(&self, threshold: &ReferenceThreshold) -> AppResult<()> {
        sqlx::query(THRESHOLD_UPSERT)
            .bind(threshold.id)
            .bind(&threshold.monitoring_type)
            .bind(&threshold.unit)
            .bind(threshold.comparator_type.to_string())
            .bind(&threshold.sex)
            .bind(&threshold.age_band)
            .bind(&threshold.source_system_scope)
            .bind(threshold.low_critical)
            .bind(threshold.low_warning)
            .bind(threshold.high_warning)
            .bind(threshold.high_critical)
            .bind(Json(&threshold.coded_abnormal_values))
            .bind(threshold.enabled)
            .bind(&threshold.version)
            .bind(&threshold.updated_by)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReferenceThreshold>> {
        let row: Option<ThresholdRow> = sqlx::query_as(THRESHOLD_FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReferenceThreshold::try_from).transpose()
    }

    async fn enabled_for_type(
        &self,
        monitoring_type: &str,
    ) -> AppResult<Vec<ReferenceThreshold>> {
        let rows: Vec<ThresholdRow> = sqlx::query_as(THRESHOLD_ENABLED_FOR_TYPE)
            .bind(monitoring_type)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ReferenceThreshold::try_from).collect()
    }
}
