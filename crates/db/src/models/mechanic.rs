use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

/// A member of the workshop staff who can be assigned to jobs and appointments.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Mechanic {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub hourly_rate_cents: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateMechanic {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 255), email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub specialization: Option<String>,
    #[validate(range(min = 0))]
    pub hourly_rate_cents: i64,
}

pub type UpdateMechanic = CreateMechanic;

impl Mechanic {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        active_only: bool,
    ) -> Result<Page<Self>, sqlx::Error> {
        let pattern = request.like_pattern();
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM mechanics
               WHERE ($1 IS NULL OR first_name LIKE $1 OR last_name LIKE $1 OR email LIKE $1 OR specialization LIKE $1)
                 AND ($2 = 0 OR active = 1)"#,
        )
        .bind(&pattern)
        .bind(active_only)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, Mechanic>(
            r#"SELECT * FROM mechanics
               WHERE ($1 IS NULL OR first_name LIKE $1 OR last_name LIKE $1 OR email LIKE $1 OR specialization LIKE $1)
                 AND ($2 = 0 OR active = 1)
               ORDER BY last_name ASC, first_name ASC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(&pattern)
        .bind(active_only)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>("SELECT * FROM mechanics WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>("SELECT * FROM mechanics WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_work_order_id(
        pool: &SqlitePool,
        work_order_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>(
            r#"SELECT m.* FROM mechanics m
               JOIN work_order_mechanics wom ON wom.mechanic_id = m.id
               WHERE wom.work_order_id = $1
               ORDER BY wom.assigned_at ASC"#,
        )
        .bind(work_order_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMechanic,
        mechanic_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>(
            r#"INSERT INTO mechanics (id, first_name, last_name, email, phone, specialization, hourly_rate_cents, active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $8)
               RETURNING *"#,
        )
        .bind(mechanic_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.specialization)
        .bind(data.hourly_rate_cents)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMechanic,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>(
            r#"UPDATE mechanics
               SET first_name = $2, last_name = $3, email = $4, phone = $5, specialization = $6, hourly_rate_cents = $7, updated_at = $8
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.specialization)
        .bind(data.hourly_rate_cents)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mechanic>(
            "UPDATE mechanics SET active = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Work orders this mechanic is assigned to that are not completed yet.
    pub async fn count_open_work_orders(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM work_order_mechanics wom
               JOIN work_orders wo ON wo.id = wom.work_order_id
               WHERE wom.mechanic_id = $1 AND wo.completed_at IS NULL"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// References that would break a delete: any work order assignment, session,
    /// or appointment at all.
    pub async fn count_references(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT
                 (SELECT COUNT(*) FROM work_order_mechanics WHERE mechanic_id = $1)
               + (SELECT COUNT(*) FROM work_sessions WHERE mechanic_id = $1)
               + (SELECT COUNT(*) FROM appointments WHERE mechanic_id = $1)"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM mechanics WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
