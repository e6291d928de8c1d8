use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use super::work_status::WorkStatus;
use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkOrder {
    pub id: Uuid,
    pub motorcycle_id: Uuid,
    pub customer_id: Uuid,
    pub appointment_id: Option<Uuid>, // Appointment this order was created from, if any
    pub description: String,
    pub diagnosis: Option<String>,
    pub labor_hours: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Work order as shown in lists: owner and motorcycle labels, parts total and derived status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkOrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub work_order: WorkOrder,
    pub customer_name: String,
    pub motorcycle_label: String,
    pub vin: String,
    pub parts_total_cents: i64,
    pub invoice_id: Option<Uuid>,
    #[sqlx(skip)]
    pub status: WorkStatus,
}

impl std::ops::Deref for WorkOrderSummary {
    type Target = WorkOrder;
    fn deref(&self) -> &Self::Target {
        &self.work_order
    }
}

/// A part consumed by a work order. The unit price is captured when the line is added.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkOrderPart {
    pub id: Uuid,
    pub work_order_id: Uuid,
    pub part_id: Uuid,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkOrderPartLine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub line: WorkOrderPart,
    pub sku: String,
    pub part_name: String,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateWorkOrder {
    pub motorcycle_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(max = 2000))]
    pub diagnosis: Option<String>,
    #[validate(custom(function = "crate::validation::non_negative_hours"))]
    pub labor_hours: Option<f64>,
    pub mechanic_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct UpdateWorkOrder {
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(max = 2000))]
    pub diagnosis: Option<String>,
    #[validate(custom(function = "crate::validation::non_negative_hours"))]
    pub labor_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct AddWorkOrderPart {
    pub part_id: Uuid,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    pub status: Option<WorkStatus>,
    pub customer_id: Option<Uuid>,
    pub mechanic_id: Option<Uuid>,
}

const SUMMARY_SELECT: &str = r#"SELECT wo.*,
       c.first_name || ' ' || c.last_name AS customer_name,
       mm.make || ' ' || mm.name || ' (' || mm.year || ')' AS motorcycle_label,
       m.vin AS vin,
       COALESCE((SELECT SUM(wop.quantity * wop.unit_price_cents)
                   FROM work_order_parts wop
                  WHERE wop.work_order_id = wo.id), 0) AS parts_total_cents,
       (SELECT i.id FROM invoices i WHERE i.work_order_id = wo.id) AS invoice_id
  FROM work_orders wo
  JOIN customers c ON c.id = wo.customer_id
  JOIN motorcycles m ON m.id = wo.motorcycle_id
  JOIN motorcycle_models mm ON mm.id = m.motorcycle_model_id"#;

impl WorkOrder {
    pub fn status(&self) -> WorkStatus {
        WorkStatus::from_dates(self.started_at, self.completed_at)
    }

    fn with_status(mut summary: WorkOrderSummary) -> WorkOrderSummary {
        summary.status = summary.work_order.status();
        summary
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &WorkOrderFilter,
    ) -> Result<Page<WorkOrderSummary>, sqlx::Error> {
        let pattern = request.like_pattern();
        let status_clause = filter
            .status
            .map(|status| format!("AND {}", status.sql_predicate("wo")))
            .unwrap_or_default();
        let where_clause = format!(
            r#"WHERE ($1 IS NULL OR wo.description LIKE $1 OR m.vin LIKE $1 OR c.last_name LIKE $1)
                 AND ($2 IS NULL OR wo.customer_id = $2)
                 AND ($3 IS NULL OR EXISTS (SELECT 1 FROM work_order_mechanics wom
                                             WHERE wom.work_order_id = wo.id AND wom.mechanic_id = $3))
                 {status_clause}"#
        );

        let total: i64 = sqlx::query_scalar(&format!(
            r#"SELECT COUNT(*) FROM work_orders wo
               JOIN customers c ON c.id = wo.customer_id
               JOIN motorcycles m ON m.id = wo.motorcycle_id
               {where_clause}"#
        ))
        .bind(&pattern)
        .bind(filter.customer_id)
        .bind(filter.mechanic_id)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, WorkOrderSummary>(&format!(
            "{SUMMARY_SELECT} {where_clause} ORDER BY wo.created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&pattern)
        .bind(filter.customer_id)
        .bind(filter.mechanic_id)
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
        sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<WorkOrderSummary>, sqlx::Error> {
        let summary =
            sqlx::query_as::<_, WorkOrderSummary>(&format!("{SUMMARY_SELECT} WHERE wo.id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(summary.map(Self::with_status))
    }

    pub async fn find_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<WorkOrderSummary>, sqlx::Error> {
        let items = sqlx::query_as::<_, WorkOrderSummary>(&format!(
            "{SUMMARY_SELECT} WHERE wo.customer_id = $1 ORDER BY wo.created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        Ok(items.into_iter().map(Self::with_status).collect())
    }

    pub async fn find_by_motorcycle_id(
        pool: &SqlitePool,
        motorcycle_id: Uuid,
    ) -> Result<Vec<WorkOrderSummary>, sqlx::Error> {
        let items = sqlx::query_as::<_, WorkOrderSummary>(&format!(
            "{SUMMARY_SELECT} WHERE wo.motorcycle_id = $1 ORDER BY wo.created_at DESC"
        ))
        .bind(motorcycle_id)
        .fetch_all(pool)
        .await?;
        Ok(items.into_iter().map(Self::with_status).collect())
    }

    /// Open work orders the mechanic is assigned to.
    pub async fn find_open_by_mechanic_id(
        pool: &SqlitePool,
        mechanic_id: Uuid,
    ) -> Result<Vec<WorkOrderSummary>, sqlx::Error> {
        let items = sqlx::query_as::<_, WorkOrderSummary>(&format!(
            r#"{SUMMARY_SELECT}
               JOIN work_order_mechanics wom ON wom.work_order_id = wo.id
               WHERE wom.mechanic_id = $1 AND wo.completed_at IS NULL
               ORDER BY wo.created_at ASC"#
        ))
        .bind(mechanic_id)
        .fetch_all(pool)
        .await?;
        Ok(items.into_iter().map(Self::with_status).collect())
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        customer_id: Uuid,
        appointment_id: Option<Uuid>,
        data: &CreateWorkOrder,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkOrder>(
            r#"INSERT INTO work_orders (id, motorcycle_id, customer_id, appointment_id, description, diagnosis, labor_hours, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.motorcycle_id)
        .bind(customer_id)
        .bind(appointment_id)
        .bind(&data.description)
        .bind(&data.diagnosis)
        .bind(data.labor_hours.unwrap_or(0.0))
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateWorkOrder,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkOrder>(
            r#"UPDATE work_orders
               SET description = $2, diagnosis = $3, labor_hours = $4, updated_at = $5
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.description)
        .bind(&data.diagnosis)
        .bind(data.labor_hours)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Write both progress dates at once.
    pub async fn set_progress(
        pool: &SqlitePool,
        id: Uuid,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkOrder>(
            r#"UPDATE work_orders
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

    pub async fn assign_mechanic<'e, E>(
        executor: E,
        work_order_id: Uuid,
        mechanic_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO work_order_mechanics (work_order_id, mechanic_id, assigned_at)
               VALUES ($1, $2, $3)
               ON CONFLICT(work_order_id, mechanic_id) DO NOTHING"#,
        )
        .bind(work_order_id)
        .bind(mechanic_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn unassign_mechanic(
        pool: &SqlitePool,
        work_order_id: Uuid,
        mechanic_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM work_order_mechanics WHERE work_order_id = $1 AND mechanic_id = $2",
        )
        .bind(work_order_id)
        .bind(mechanic_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn parts_total_cents<'e, E>(executor: E, id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(quantity * unit_price_cents), 0)
               FROM work_order_parts
               WHERE work_order_id = $1"#,
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }

    pub async fn count_open(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM work_orders WHERE completed_at IS NULL")
            .fetch_one(pool)
            .await
    }

    pub async fn count_open_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM work_orders WHERE customer_id = $1 AND completed_at IS NULL",
        )
        .bind(customer_id)
        .fetch_one(pool)
        .await
    }

    /// Drop the back-reference held by the appointment this order was created from.
    pub async fn unlink_appointments<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE appointments SET work_order_id = NULL, updated_at = $2 WHERE work_order_id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM work_orders WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl WorkOrderPart {
    pub async fn create<'e, E>(
        executor: E,
        work_order_id: Uuid,
        part_id: Uuid,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkOrderPart>(
            r#"INSERT INTO work_order_parts (id, work_order_id, part_id, quantity, unit_price_cents, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(work_order_id)
        .bind(part_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkOrderPart>("SELECT * FROM work_order_parts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_work_order_id<'e, E>(
        executor: E,
        work_order_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WorkOrderPart>(
            "SELECT * FROM work_order_parts WHERE work_order_id = $1 ORDER BY created_at ASC",
        )
        .bind(work_order_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_lines_by_work_order_id(
        pool: &SqlitePool,
        work_order_id: Uuid,
    ) -> Result<Vec<WorkOrderPartLine>, sqlx::Error> {
        sqlx::query_as::<_, WorkOrderPartLine>(
            r#"SELECT wop.*,
                      p.sku AS sku,
                      p.name AS part_name,
                      wop.quantity * wop.unit_price_cents AS line_total_cents
               FROM work_order_parts wop
               JOIN parts p ON p.id = wop.part_id
               WHERE wop.work_order_id = $1
               ORDER BY wop.created_at ASC"#,
        )
        .bind(work_order_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM work_order_parts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
