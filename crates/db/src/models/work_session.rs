use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use super::work_status::WorkStatus;
use crate::pagination::{Page, PageRequest};

/// Kind of short engagement recorded as a session rather than a full work order
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "session_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionType {
    Dyno,
    Diagnostic,
    Tuning,
    Inspection,
    #[default]
    General,
}

/// Simplified work record without parts, billed on labor only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkSession {
    pub id: Uuid,
    pub motorcycle_id: Uuid,
    pub customer_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub session_type: SessionType,
    pub description: String,
    pub labor_hours: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkSessionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub session: WorkSession,
    pub customer_name: String,
    pub motorcycle_label: String,
    pub mechanic_name: Option<String>,
    pub invoice_id: Option<Uuid>,
    #[sqlx(skip)]
    pub status: WorkStatus,
}

impl std::ops::Deref for WorkSessionSummary {
    type Target = WorkSession;
    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateWorkSession {
    pub motorcycle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub session_type: Option<SessionType>,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(custom(function = "crate::validation::non_negative_hours"))]
    pub labor_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct UpdateWorkSession {
    pub mechanic_id: Option<Uuid>,
    pub session_type: SessionType,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(custom(function = "crate::validation::non_negative_hours"))]
    pub labor_hours: f64,
}

const SUMMARY_SELECT: &str = r#"SELECT ws.*,
       c.first_name || ' ' || c.last_name AS customer_name,
       mm.make || ' ' || mm.name || ' (' || mm.year || ')' AS motorcycle_label,
       me.first_name || ' ' || me.last_name AS mechanic_name,
       (SELECT i.id FROM invoices i WHERE i.work_session_id = ws.id) AS invoice_id
  FROM work_sessions ws
  JOIN customers c ON c.id = ws.customer_id
  JOIN motorcycles m ON m.id = ws.motorcycle_id
  JOIN motorcycle_models mm ON mm.id = m.motorcycle_model_id
  LEFT JOIN mechanics me ON me.id = ws.mechanic_id"#;

impl WorkSession {
    pub fn status(&self) -> WorkStatus {
        WorkStatus::from_dates(self.started_at, self.completed_at)
    }

    fn with_status(mut summary: WorkSessionSummary) -> WorkSessionSummary {
        summary.status = summary.session.status();
        summary
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        status: Option<WorkStatus>,
    ) -> Result<Page<WorkSessionSummary>, sqlx::Error> {
        let pattern = request.like_pattern();
        let status_clause = status
            .map(|status| format!("AND {}", status.sql_predicate("ws")))
            .unwrap_or_default();
        let where_clause = format!(
            "WHERE ($1 IS NULL OR ws.description LIKE $1 OR c.last_name LIKE $1) {status_clause}"
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM work_sessions ws JOIN customers c ON c.id = ws.customer_id {where_clause}"
        ))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, WorkSessionSummary>(&format!(
            "{SUMMARY_SELECT} {where_clause} ORDER BY ws.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(
            items.into_iter().map(Self::with_status).collect(),
            total,
            request,
        ))
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkSession>("SELECT * FROM work_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<WorkSessionSummary>, sqlx::Error> {
        let summary =
            sqlx::query_as::<_, WorkSessionSummary>(&format!("{SUMMARY_SELECT} WHERE ws.id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(summary.map(Self::with_status))
    }

    pub async fn find_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<WorkSessionSummary>, sqlx::Error> {
        let items = sqlx::query_as::<_, WorkSessionSummary>(&format!(
            "{SUMMARY_SELECT} WHERE ws.customer_id = $1 ORDER BY ws.created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        Ok(items.into_iter().map(Self::with_status).collect())
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        customer_id: Uuid,
        data: &CreateWorkSession,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WorkSession>(
            r#"INSERT INTO work_sessions (id, motorcycle_id, customer_id, mechanic_id, session_type, description, labor_hours, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.motorcycle_id)
        .bind(customer_id)
        .bind(data.mechanic_id)
        .bind(data.session_type.unwrap_or_default())
        .bind(&data.description)
        .bind(data.labor_hours.unwrap_or(0.0))
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateWorkSession,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkSession>(
            r#"UPDATE work_sessions
               SET mechanic_id = $2, session_type = $3, description = $4, labor_hours = $5, updated_at = $6
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.mechanic_id)
        .bind(data.session_type)
        .bind(&data.description)
        .bind(data.labor_hours)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn set_progress(
        pool: &SqlitePool,
        id: Uuid,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkSession>(
            r#"UPDATE work_sessions
               SET started_at = $2, completed_at = $3, updated_at = $4
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(started_at)
        .bind(completed_at)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM work_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
