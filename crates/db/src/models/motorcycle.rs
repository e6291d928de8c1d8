use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Motorcycle {
    pub id: Uuid,
    pub customer_id: Uuid,          // Owner
    pub motorcycle_model_id: Uuid,
    pub vin: String,
    pub license_plate: Option<String>,
    pub color: Option<String>,
    pub mileage: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Motorcycle joined with its model and owner, as shown in lists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MotorcycleSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub motorcycle: Motorcycle,
    pub make: String,
    pub model_name: String,
    pub year: i32,
    pub owner_name: String,
}

impl std::ops::Deref for MotorcycleSummary {
    type Target = Motorcycle;
    fn deref(&self) -> &Self::Target {
        &self.motorcycle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateMotorcycle {
    pub customer_id: Uuid,
    pub motorcycle_model_id: Uuid,
    #[validate(length(min = 1, max = 17))]
    pub vin: String,
    #[validate(length(max = 20))]
    pub license_plate: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(range(min = 0))]
    pub mileage: Option<i64>,
    pub notes: Option<String>,
}

pub type UpdateMotorcycle = CreateMotorcycle;

const SUMMARY_SELECT: &str = r#"SELECT m.*,
       mm.make AS make,
       mm.name AS model_name,
       mm.year AS year,
       c.first_name || ' ' || c.last_name AS owner_name
  FROM motorcycles m
  JOIN motorcycle_models mm ON mm.id = m.motorcycle_model_id
  JOIN customers c ON c.id = m.customer_id"#;

impl Motorcycle {
    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        customer_id: Option<Uuid>,
    ) -> Result<Page<MotorcycleSummary>, sqlx::Error> {
        let pattern = request.like_pattern();
        let filter = r#"WHERE ($1 IS NULL OR m.vin LIKE $1 OR m.license_plate LIKE $1 OR mm.make LIKE $1 OR mm.name LIKE $1)
                          AND ($2 IS NULL OR m.customer_id = $2)"#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM motorcycles m JOIN motorcycle_models mm ON mm.id = m.motorcycle_model_id {filter}"
        ))
        .bind(&pattern)
        .bind(customer_id)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, MotorcycleSummary>(&format!(
            "{SUMMARY_SELECT} {filter} ORDER BY m.created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(&pattern)
        .bind(customer_id)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Motorcycle>("SELECT * FROM motorcycles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<MotorcycleSummary>, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleSummary>(&format!("{SUMMARY_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<MotorcycleSummary>, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleSummary>(&format!(
            "{SUMMARY_SELECT} WHERE m.customer_id = $1 ORDER BY m.created_at ASC"
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_vin(pool: &SqlitePool, vin: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Motorcycle>("SELECT * FROM motorcycles WHERE upper(vin) = upper($1)")
            .bind(vin)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMotorcycle,
        motorcycle_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Motorcycle>(
            r#"INSERT INTO motorcycles (id, customer_id, motorcycle_model_id, vin, license_plate, color, mileage, notes, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
               RETURNING *"#,
        )
        .bind(motorcycle_id)
        .bind(data.customer_id)
        .bind(data.motorcycle_model_id)
        .bind(&data.vin)
        .bind(&data.license_plate)
        .bind(&data.color)
        .bind(data.mileage.unwrap_or(0))
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMotorcycle,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Motorcycle>(
            r#"UPDATE motorcycles
               SET customer_id = $2, motorcycle_model_id = $3, vin = $4, license_plate = $5, color = $6, mileage = $7, notes = $8, updated_at = $9
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.customer_id)
        .bind(data.motorcycle_model_id)
        .bind(&data.vin)
        .bind(&data.license_plate)
        .bind(&data.color)
        .bind(data.mileage.unwrap_or(0))
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Work orders, work sessions and appointments recorded against this motorcycle.
    pub async fn count_service_records(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT
                 (SELECT COUNT(*) FROM work_orders WHERE motorcycle_id = $1)
               + (SELECT COUNT(*) FROM work_sessions WHERE motorcycle_id = $1)
               + (SELECT COUNT(*) FROM appointments WHERE motorcycle_id = $1)"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM motorcycles WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM motorcycles")
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM motorcycles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
