//! Database health check backing the health endpoint.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Tables the shop cannot run without.
pub const REQUIRED_TABLES: &[&str] = &[
    "customers",
    "mechanics",
    "motorcycle_models",
    "motorcycles",
    "suppliers",
    "parts",
    "work_orders",
    "work_order_mechanics",
    "work_order_parts",
    "work_sessions",
    "appointments",
    "invoices",
];

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct DatabaseHealth {
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl DatabaseHealth {
    pub fn is_ok(&self) -> bool {
        self.migrations_applied > 0 && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.migrations_applied == 0 {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("Database OK - {} migrations applied", self.migrations_applied)
        }
    }
}

pub struct HealthService;

impl HealthService {
    pub async fn check(pool: &SqlitePool) -> Result<DatabaseHealth, HealthError> {
        let has_migrations_table: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(pool)
        .await?;

        let (migrations_applied, latest_migration) = if has_migrations_table > 0 {
            let applied: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                    .fetch_one(pool)
                    .await?;
            let latest: Option<String> = sqlx::query_scalar(
                "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
            )
            .fetch_optional(pool)
            .await?;
            (applied, latest)
        } else {
            (0, None)
        };

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
            )
            .bind(table)
            .fetch_one(pool)
            .await?;
            if exists == 0 {
                missing_tables.push(table.to_string());
            }
        }

        let health = DatabaseHealth {
            migrations_applied,
            latest_migration,
            missing_tables,
        };
        if health.is_ok() {
            info!(migrations_applied, "Database health check passed");
        } else {
            warn!(summary = %health.summary(), "Database health check failed");
        }
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    #[tokio::test]
    async fn test_migrated_database_is_healthy() {
        let pool = test_support::pool().await;
        let health = HealthService::check(&pool).await.unwrap();
        assert!(health.is_ok(), "{}", health.summary());
        assert_eq!(health.migrations_applied, 5);
        assert_eq!(health.latest_migration.as_deref(), Some("invoices"));
    }

    #[tokio::test]
    async fn test_empty_database_reports_missing_tables() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let health = HealthService::check(&pool).await.unwrap();
        assert!(!health.is_ok());
        assert_eq!(health.missing_tables.len(), REQUIRED_TABLES.len());
    }
}
