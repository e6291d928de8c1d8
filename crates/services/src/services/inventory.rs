//! Suppliers and the parts stock they provide.

use db::{
    models::{
        part::{CreatePart, Part, PartFilter, PartWithSupplier, UpdatePart},
        supplier::{CreateSupplier, Supplier, SupplierWithPartCount, UpdateSupplier},
    },
    pagination::{Page, PageRequest},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validation::{ValidationErrors, clean, clean_optional};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("supplier not found")]
    SupplierNotFound,
    #[error("part not found")]
    PartNotFound,
    #[error("cannot delete a supplier that still has {0} part(s)")]
    SupplierHasParts(i64),
    #[error("part is used on {0} work order line(s)")]
    PartInUse(i64),
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SupplierDetails {
    pub supplier: Supplier,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct StockAdjustment {
    /// Signed change; negative values take stock out. Bounded so the stock
    /// arithmetic cannot overflow.
    #[validate(
        range(min = -1_000_000, max = 1_000_000),
        custom(function = "non_zero")
    )]
    pub delta: i64,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

fn non_zero(delta: i64) -> Result<(), ValidationError> {
    if delta == 0 {
        Err(ValidationError::new("non_zero"))
    } else {
        Ok(())
    }
}

pub struct InventoryService;

impl InventoryService {
    pub async fn list_suppliers(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<SupplierWithPartCount>, InventoryError> {
        Ok(Supplier::find_page(pool, request).await?)
    }

    pub async fn get_supplier(pool: &SqlitePool, id: Uuid) -> Result<Supplier, InventoryError> {
        Supplier::find_by_id(pool, id)
            .await?
            .ok_or(InventoryError::SupplierNotFound)
    }

    pub async fn supplier_details(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<SupplierDetails, InventoryError> {
        let supplier = Self::get_supplier(pool, id).await?;
        let parts = Part::find_by_supplier_id(pool, id).await?;
        Ok(SupplierDetails { supplier, parts })
    }

    pub async fn create_supplier(
        pool: &SqlitePool,
        data: &CreateSupplier,
    ) -> Result<Supplier, InventoryError> {
        let data = Self::validate_supplier(data)?;
        let supplier = Supplier::create(pool, &data, Uuid::new_v4()).await?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn update_supplier(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateSupplier,
    ) -> Result<Supplier, InventoryError> {
        let data = Self::validate_supplier(data)?;
        Supplier::update(pool, id, &data)
            .await?
            .ok_or(InventoryError::SupplierNotFound)
    }

    pub async fn delete_supplier(pool: &SqlitePool, id: Uuid) -> Result<(), InventoryError> {
        Self::get_supplier(pool, id).await?;
        let parts = Supplier::count_parts(pool, id).await?;
        if parts > 0 {
            return Err(InventoryError::SupplierHasParts(parts));
        }
        Supplier::delete(pool, id).await?;
        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }

    pub async fn list_parts(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &PartFilter,
    ) -> Result<Page<PartWithSupplier>, InventoryError> {
        Ok(Part::find_page(pool, request, filter).await?)
    }

    pub async fn get_part(pool: &SqlitePool, id: Uuid) -> Result<PartWithSupplier, InventoryError> {
        Part::find_with_supplier_by_id(pool, id)
            .await?
            .ok_or(InventoryError::PartNotFound)
    }

    pub async fn low_stock(pool: &SqlitePool) -> Result<Vec<PartWithSupplier>, InventoryError> {
        Ok(Part::find_low_stock(pool).await?)
    }

    /// `default_reorder_level` applies when the request leaves the reorder level out.
    pub async fn create_part(
        pool: &SqlitePool,
        data: &CreatePart,
        default_reorder_level: i64,
    ) -> Result<Part, InventoryError> {
        let data = CreatePart {
            supplier_id: data.supplier_id,
            sku: clean(&data.sku).to_uppercase(),
            name: clean(&data.name),
            description: clean_optional(data.description.clone()),
            unit_price_cents: data.unit_price_cents,
            stock_quantity: Some(data.stock_quantity.unwrap_or(0)),
            reorder_level: Some(data.reorder_level.unwrap_or(default_reorder_level)),
        };

        let mut errors = ValidationErrors::of(&data);
        Self::check_part_references(pool, &mut errors, data.supplier_id, &data.sku, None).await?;
        errors.into_result()?;

        let part = Part::create(pool, &data, Uuid::new_v4()).await?;
        info!(part_id = %part.id, sku = %part.sku, stock = part.stock_quantity, "Part created");
        Ok(part)
    }

    /// Stock is not editable here; it only moves through `adjust_stock` and work order lines.
    pub async fn update_part(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdatePart,
    ) -> Result<Part, InventoryError> {
        Self::get_part(pool, id).await?;
        let data = UpdatePart {
            supplier_id: data.supplier_id,
            sku: clean(&data.sku).to_uppercase(),
            name: clean(&data.name),
            description: clean_optional(data.description.clone()),
            unit_price_cents: data.unit_price_cents,
            reorder_level: data.reorder_level,
        };

        let mut errors = ValidationErrors::of(&data);
        Self::check_part_references(pool, &mut errors, data.supplier_id, &data.sku, Some(id))
            .await?;
        errors.into_result()?;

        Part::update(pool, id, &data)
            .await?
            .ok_or(InventoryError::PartNotFound)
    }

    pub async fn adjust_stock(
        pool: &SqlitePool,
        id: Uuid,
        adjustment: &StockAdjustment,
    ) -> Result<Part, InventoryError> {
        ValidationErrors::of(adjustment).into_result()?;

        match Part::adjust_stock(pool, id, adjustment.delta).await? {
            Some(part) => {
                info!(
                    part_id = %id,
                    delta = adjustment.delta,
                    stock = part.stock_quantity,
                    reason = adjustment.reason.as_deref().unwrap_or(""),
                    "Stock adjusted"
                );
                if part.is_low_stock() {
                    warn!(part_id = %id, sku = %part.sku, stock = part.stock_quantity, "Part is low on stock");
                }
                Ok(part)
            }
            None => {
                let part = Part::find_by_id(pool, id)
                    .await?
                    .ok_or(InventoryError::PartNotFound)?;
                Err(InventoryError::InsufficientStock {
                    available: part.stock_quantity,
                    requested: adjustment.delta.saturating_neg(),
                })
            }
        }
    }

    pub async fn delete_part(pool: &SqlitePool, id: Uuid) -> Result<(), InventoryError> {
        Self::get_part(pool, id).await?;
        let lines = Part::count_work_order_lines(pool, id).await?;
        if lines > 0 {
            return Err(InventoryError::PartInUse(lines));
        }
        Part::delete(pool, id).await?;
        info!(part_id = %id, "Part deleted");
        Ok(())
    }

    fn validate_supplier(data: &CreateSupplier) -> Result<CreateSupplier, InventoryError> {
        let data = CreateSupplier {
            name: clean(&data.name),
            contact_name: clean_optional(data.contact_name.clone()),
            email: clean_optional(data.email.clone()).map(|e| e.to_lowercase()),
            phone: clean_optional(data.phone.clone()),
            address: clean_optional(data.address.clone()),
        };

        ValidationErrors::of(&data).into_result()?;

        Ok(data)
    }

    /// Supplier must exist and the SKU must not belong to another part.
    async fn check_part_references(
        pool: &SqlitePool,
        errors: &mut ValidationErrors,
        supplier_id: Uuid,
        sku: &str,
        existing_id: Option<Uuid>,
    ) -> Result<(), InventoryError> {
        let supplier_exists = Supplier::find_by_id(pool, supplier_id).await?.is_some();
        let sku_taken = match Part::find_by_sku(pool, sku).await? {
            Some(other) => Some(other.id) != existing_id,
            None => false,
        };
        errors
            .check("supplier_id", supplier_exists, "The selected supplier is invalid.")
            .check("sku", !sku_taken, "The sku has already been taken.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::models::work_order::AddWorkOrderPart;

    use super::*;
    use crate::services::{test_support, work_orders::WorkOrderService};

    #[tokio::test]
    async fn test_supplier_with_parts_cannot_be_deleted() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        test_support::part(&pool, supplier.id, 1_500, 4).await;

        let err = InventoryService::delete_supplier(&pool, supplier.id)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::SupplierHasParts(1)));
        assert!(InventoryService::get_supplier(&pool, supplier.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_supplier_email_must_be_valid_when_present() {
        let pool = test_support::pool().await;
        let data = CreateSupplier {
            name: "Motul".to_string(),
            contact_name: None,
            email: Some("sales-at-motul".to_string()),
            phone: None,
            address: None,
        };
        let err = InventoryService::create_supplier(&pool, &data)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(ref v) if v.has("email")));
    }

    #[tokio::test]
    async fn test_create_part_uses_default_reorder_level() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        let data = CreatePart {
            supplier_id: supplier.id,
            sku: " oil-10w40 ".to_string(),
            name: "Engine oil 10W-40".to_string(),
            description: None,
            unit_price_cents: 2_499,
            stock_quantity: Some(12),
            reorder_level: None,
        };

        let part = InventoryService::create_part(&pool, &data, 5).await.unwrap();
        assert_eq!(part.sku, "OIL-10W40");
        assert_eq!(part.reorder_level, 5);

        let err = InventoryService::create_part(&pool, &data, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(ref v) if v.has("sku")));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        let part = test_support::part(&pool, supplier.id, 1_500, 3).await;

        let part = InventoryService::adjust_stock(
            &pool,
            part.id,
            &StockAdjustment {
                delta: -2,
                reason: Some("shop use".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(part.stock_quantity, 1);

        let err = InventoryService::adjust_stock(
            &pool,
            part.id,
            &StockAdjustment {
                delta: -5,
                reason: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock {
                available: 1,
                requested: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_low_stock_report() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        let low = test_support::part(&pool, supplier.id, 1_000, 2).await;
        test_support::part(&pool, supplier.id, 1_000, 10).await;

        let report = InventoryService::low_stock(&pool).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id, low.id);
        assert!(report[0].low_stock);
    }

    #[tokio::test]
    async fn test_adjust_missing_part_is_not_found() {
        let pool = test_support::pool().await;
        let err = InventoryService::adjust_stock(
            &pool,
            Uuid::new_v4(),
            &StockAdjustment {
                delta: 1,
                reason: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InventoryError::PartNotFound));
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_out_of_range_delta() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        let part = test_support::part(&pool, supplier.id, 1_500, 3).await;

        for delta in [i64::MIN, i64::MAX, -1_000_001, 0] {
            let err = InventoryService::adjust_stock(
                &pool,
                part.id,
                &StockAdjustment {
                    delta,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
            assert!(
                matches!(err, InventoryError::Validation(ref v) if v.has("delta")),
                "delta {delta} was accepted"
            );
        }

        let part = InventoryService::get_part(&pool, part.id).await.unwrap();
        assert_eq!(part.part.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_largest_withdrawal_reports_shortfall() {
        let pool = test_support::pool().await;
        let supplier = test_support::supplier(&pool).await;
        let part = test_support::part(&pool, supplier.id, 1_500, 3).await;

        let err = InventoryService::adjust_stock(
            &pool,
            part.id,
            &StockAdjustment {
                delta: -1_000_000,
                reason: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock {
                available: 3,
                requested: 1_000_000
            }
        ));
    }

    #[tokio::test]
    async fn test_part_on_work_order_cannot_be_deleted() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        let supplier = test_support::supplier(&pool).await;
        let part = test_support::part(&pool, supplier.id, 4_200, 6).await;
        let work_order = test_support::work_order(&pool, &motorcycle).await;
        WorkOrderService::add_part(
            &pool,
            work_order.id,
            &AddWorkOrderPart {
                part_id: part.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

        let err = InventoryService::delete_part(&pool, part.id)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::PartInUse(1)));

        let kept = InventoryService::get_part(&pool, part.id).await.unwrap();
        assert_eq!(kept.part.stock_quantity, 4);
    }
}
