use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateCustomer {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 255), email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Full replacement of the editable fields, as submitted by the edit form.
pub type UpdateCustomer = CreateCustomer;

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let pattern = request.like_pattern();
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM customers
               WHERE $1 IS NULL
                  OR first_name LIKE $1 OR last_name LIKE $1
                  OR email LIKE $1 OR phone LIKE $1"#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, Customer>(
            r#"SELECT * FROM customers
               WHERE $1 IS NULL
                  OR first_name LIKE $1 OR last_name LIKE $1
                  OR email LIKE $1 OR phone LIKE $1
               ORDER BY last_name ASC, first_name ASC
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
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateCustomer,
        customer_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Customer>(
            r#"INSERT INTO customers (id, first_name, last_name, email, phone, address, notes, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING *"#,
        )
        .bind(customer_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.notes)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateCustomer,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"UPDATE customers
               SET first_name = $2, last_name = $3, email = $4, phone = $5, address = $6, notes = $7, updated_at = $8
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(pool)
            .await
    }
}
