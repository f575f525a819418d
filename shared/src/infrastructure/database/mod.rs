use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::shared::{AppError, AppResult};

/// Reusable database service for connection management and health checks.
pub struct DatabaseService {
    pool: PgPool,
}

impl DatabaseService {
    /// Create a new database service from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health with a simple query
    pub async fn health_check(&self) -> AppResult<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(AppError::Database)
    }

    /// Check database health with timeout
    pub async fn health_check_with_timeout(&self, timeout: Duration) -> AppResult<bool> {
        tokio::time::timeout(timeout, self.health_check())
            .await
            .map_err(|_| AppError::DependencyUnavailable("database health check timeout".to_string()))?
    }

    /// Get active connection count
    pub fn active_connections(&self) -> u32 {
        self.pool.size()
    }
}

/// Create a new database pool from configuration
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(&config.url)
        .await
        .map_err(AppError::Database)
}
