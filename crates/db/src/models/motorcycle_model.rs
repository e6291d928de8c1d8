use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MotorcycleModel {
    pub id: Uuid,
    pub make: String,
    pub name: String,
    pub year: i32,
    pub engine_cc: Option<i32>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateMotorcycleModel {
    #[validate(length(min = 1, max = 100))]
    pub make: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// The upper bound moves with the calendar and is checked by the fleet service.
    #[validate(range(min = 1885))]
    pub year: i32,
    #[validate(range(min = 1, message = "The engine cc must be a positive number."))]
    pub engine_cc: Option<i32>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
}

pub type UpdateMotorcycleModel = CreateMotorcycleModel;

/// List row with the number of registered motorcycles of this model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MotorcycleModelWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub model: MotorcycleModel,
    pub motorcycle_count: i64,
}

impl MotorcycleModel {
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.make, self.name, self.year)
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<MotorcycleModelWithCount>, sqlx::Error> {
        let pattern = request.like_pattern();
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM motorcycle_models
               WHERE $1 IS NULL OR make LIKE $1 OR name LIKE $1 OR category LIKE $1"#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, MotorcycleModelWithCount>(
            r#"SELECT mm.*,
                      (SELECT COUNT(*) FROM motorcycles m WHERE m.motorcycle_model_id = mm.id) AS motorcycle_count
               FROM motorcycle_models mm
               WHERE $1 IS NULL OR mm.make LIKE $1 OR mm.name LIKE $1 OR mm.category LIKE $1
               ORDER BY mm.make ASC, mm.name ASC, mm.year DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(&pattern)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleModel>("SELECT * FROM motorcycle_models WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_identity(
        pool: &SqlitePool,
        make: &str,
        name: &str,
        year: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleModel>(
            r#"SELECT * FROM motorcycle_models
               WHERE lower(make) = lower($1) AND lower(name) = lower($2) AND year = $3"#,
        )
        .bind(make)
        .bind(name)
        .bind(year)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMotorcycleModel,
        model_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleModel>(
            r#"INSERT INTO motorcycle_models (id, make, name, year, engine_cc, category, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
               RETURNING *"#,
        )
        .bind(model_id)
        .bind(&data.make)
        .bind(&data.name)
        .bind(data.year)
        .bind(data.engine_cc)
        .bind(&data.category)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMotorcycleModel,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MotorcycleModel>(
            r#"UPDATE motorcycle_models
               SET make = $2, name = $3, year = $4, engine_cc = $5, category = $6, updated_at = $7
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.make)
        .bind(&data.name)
        .bind(data.year)
        .bind(data.engine_cc)
        .bind(&data.category)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn count_motorcycles(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM motorcycles WHERE motorcycle_model_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM motorcycle_models WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
