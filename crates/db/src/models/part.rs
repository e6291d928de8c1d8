use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Part {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PartWithSupplier {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub part: Part,
    pub supplier_name: String,
    pub low_stock: bool,
}

impl std::ops::Deref for PartWithSupplier {
    type Target = Part;
    fn deref(&self) -> &Self::Target {
        &self.part
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreatePart {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub stock_quantity: Option<i64>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i64>,
}

/// Editable catalogue fields. Stock only moves through stock adjustments and work order lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct UpdatePart {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
    #[validate(range(min = 0))]
    pub reorder_level: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PartFilter {
    pub supplier_id: Option<Uuid>,
    pub low_stock_only: bool,
}

const WITH_SUPPLIER_SELECT: &str = r#"SELECT p.*,
       s.name AS supplier_name,
       (p.stock_quantity <= p.reorder_level) AS low_stock
  FROM parts p
  JOIN suppliers s ON s.id = p.supplier_id"#;

impl Part {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &PartFilter,
    ) -> Result<Page<PartWithSupplier>, sqlx::Error> {
        let pattern = request.like_pattern();
        let where_clause = r#"WHERE ($1 IS NULL OR p.sku LIKE $1 OR p.name LIKE $1)
                                AND ($2 IS NULL OR p.supplier_id = $2)
                                AND ($3 = 0 OR p.stock_quantity <= p.reorder_level)"#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM parts p {where_clause}"))
            .bind(&pattern)
            .bind(filter.supplier_id)
            .bind(filter.low_stock_only)
            .fetch_one(pool)
            .await?;

        let items = sqlx::query_as::<_, PartWithSupplier>(&format!(
            "{WITH_SUPPLIER_SELECT} {where_clause} ORDER BY p.name ASC LIMIT $4 OFFSET $5"
        ))
        .bind(&pattern)
        .bind(filter.supplier_id)
        .bind(filter.low_stock_only)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_low_stock(pool: &SqlitePool) -> Result<Vec<PartWithSupplier>, sqlx::Error> {
        sqlx::query_as::<_, PartWithSupplier>(&format!(
            "{WITH_SUPPLIER_SELECT} WHERE p.stock_quantity <= p.reorder_level ORDER BY s.name ASC, p.name ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn count_low_stock(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM parts WHERE stock_quantity <= reorder_level")
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_supplier_id(
        pool: &SqlitePool,
        supplier_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Part>("SELECT * FROM parts WHERE supplier_id = $1 ORDER BY name ASC")
            .bind(supplier_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Part>("SELECT * FROM parts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_with_supplier_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<PartWithSupplier>, sqlx::Error> {
        sqlx::query_as::<_, PartWithSupplier>(&format!("{WITH_SUPPLIER_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_sku(pool: &SqlitePool, sku: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Part>("SELECT * FROM parts WHERE upper(sku) = upper($1)")
            .bind(sku)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreatePart,
        part_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Part>(
            r#"INSERT INTO parts (id, supplier_id, sku, name, description, unit_price_cents, stock_quantity, reorder_level, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
               RETURNING *"#,
        )
        .bind(part_id)
        .bind(data.supplier_id)
        .bind(&data.sku)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.unit_price_cents)
        .bind(data.stock_quantity.unwrap_or(0))
        .bind(data.reorder_level.unwrap_or(0))
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdatePart,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Part>(
            r#"UPDATE parts
               SET supplier_id = $2, sku = $3, name = $4, description = $5, unit_price_cents = $6, reorder_level = $7, updated_at = $8
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.supplier_id)
        .bind(&data.sku)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.unit_price_cents)
        .bind(data.reorder_level)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Move stock by `delta`. Returns `None` when the part does not exist or the
    /// result would go below zero; the row is left untouched in both cases.
    pub async fn adjust_stock<'e, E>(
        executor: E,
        id: Uuid,
        delta: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Part>(
            r#"UPDATE parts
               SET stock_quantity = stock_quantity + $2, updated_at = $3
               WHERE id = $1 AND stock_quantity + $2 >= 0
               RETURNING *"#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn count_work_order_lines(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM work_order_parts WHERE part_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(stock_quantity: i64, reorder_level: i64) -> Part {
        Part {
            id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            sku: "BRK-001".to_string(),
            name: "Brake pads".to_string(),
            description: None,
            unit_price_cents: 4500,
            stock_quantity,
            reorder_level,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_includes_reorder_level() {
        assert!(part(0, 0).is_low_stock());
        assert!(part(3, 3).is_low_stock());
        assert!(!part(4, 3).is_low_stock());
    }
}
