use std::time::Duration;

use sqlx::PgPool;

use super::SecurityStore;
use crate::shared::{AppError, AppResult};

const SET_IF_ABSENT: &str = r#"
    INSERT INTO security_entries (key, value, expires_at)
    VALUES ($1, $2, now() + make_interval(secs => $3))
    ON CONFLICT (key) DO UPDATE
        SET value = EXCLUDED.value,
            expires_at = EXCLUDED.expires_at
        WHERE security_entries.expires_at <= now()
    RETURNING key
"#;

const GET: &str = r#"
    SELECT value
    FROM security_entries
    WHERE key = $1 AND expires_at > now()
"#;

const INCR: &str = r#"
    INSERT INTO security_entries (key, value, expires_at)
    VALUES ($1, '1', now() + make_interval(secs => $2))
    ON CONFLICT (key) DO UPDATE
        SET value = CASE
                WHEN security_entries.expires_at <= now() THEN '1'
                ELSE (security_entries.value::bigint + 1)::text
            END,
            expires_at = CASE
                WHEN security_entries.expires_at <= now()
                    THEN now() + make_interval(secs => $2)
                ELSE security_entries.expires_at
            END
    RETURNING value::bigint
"#;

/// Security store backed by the shared Postgres database. The unique key
/// plus conditional upsert gives the same claim-once semantics as an
/// external coordination service.
pub struct SqlSecurityStore {
    pool: PgPool,
}

impl SqlSecurityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SecurityStore for SqlSecurityStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let claimed: Option<(String,)> = sqlx::query_as(SET_IF_ABSENT)
            .bind(key)
            .bind(value)
            .bind(ttl.as_secs_f64())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(claimed.is_some())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(GET)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.map(|(value,)| value))
    }

    async fn incr(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(INCR)
            .bind(key)
            .bind(ttl.as_secs_f64())
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(count)
    }
}
