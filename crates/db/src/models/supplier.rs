use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SupplierWithPartCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub supplier: Supplier,
    pub part_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateSupplier {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[validate(length(max = 255), email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub type UpdateSupplier = CreateSupplier;

impl Supplier {
    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<SupplierWithPartCount>, sqlx::Error> {
        let pattern = request.like_pattern();
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM suppliers
               WHERE $1 IS NULL OR name LIKE $1 OR contact_name LIKE $1 OR email LIKE $1"#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, SupplierWithPartCount>(
            r#"SELECT s.*,
                      (SELECT COUNT(*) FROM parts p WHERE p.supplier_id = s.id) AS part_count
               FROM suppliers s
               WHERE $1 IS NULL OR s.name LIKE $1 OR s.contact_name LIKE $1 OR s.email LIKE $1
               ORDER BY s.name ASC
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
        sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateSupplier,
        supplier_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Supplier>(
            r#"INSERT INTO suppliers (id, name, contact_name, email, phone, address, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
               RETURNING *"#,
        )
        .bind(supplier_id)
        .bind(&data.name)
        .bind(&data.contact_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateSupplier,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Supplier>(
            r#"UPDATE suppliers
               SET name = $2, contact_name = $3, email = $4, phone = $5, address = $6, updated_at = $7
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.contact_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn count_parts(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM parts WHERE supplier_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
