//! Work order lifecycle, mechanic assignment and part lines with their stock movements.

use chrono::Utc;
use db::{
    models::{
        customer::Customer,
        invoice::{Invoice, InvoiceSource},
        mechanic::Mechanic,
        motorcycle::{Motorcycle, MotorcycleSummary},
        part::Part,
        work_order::{
            AddWorkOrderPart, CreateWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderFilter,
            WorkOrderPart, WorkOrderPartLine, WorkOrderSummary,
        },
        work_status::WorkStatus,
    },
    pagination::{Page, PageRequest},
};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationErrors, clean, clean_optional};

#[derive(Debug, Error)]
pub enum WorkOrderError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("work order not found")]
    NotFound,
    #[error("part not found")]
    PartNotFound,
    #[error("part line not found on this work order")]
    LineNotFound,
    #[error("mechanic is not assigned to this work order")]
    MechanicNotAssigned,
    #[error("work order is already invoiced")]
    AlreadyInvoiced,
    #[error("work order is {0}")]
    InvalidState(WorkStatus),
    #[error("insufficient stock for {sku}: {available} available, {requested} requested")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WorkOrderDetails {
    pub work_order: WorkOrderSummary,
    pub motorcycle: MotorcycleSummary,
    pub customer: Customer,
    pub mechanics: Vec<Mechanic>,
    pub parts: Vec<WorkOrderPartLine>,
    pub invoice: Option<Invoice>,
}

pub struct WorkOrderService;

impl WorkOrderService {
    pub async fn list(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &WorkOrderFilter,
    ) -> Result<Page<WorkOrderSummary>, WorkOrderError> {
        Ok(WorkOrder::find_page(pool, request, filter).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<WorkOrder, WorkOrderError> {
        WorkOrder::find_by_id(pool, id)
            .await?
            .ok_or(WorkOrderError::NotFound)
    }

    pub async fn details(pool: &SqlitePool, id: Uuid) -> Result<WorkOrderDetails, WorkOrderError> {
        let work_order = WorkOrder::find_summary_by_id(pool, id)
            .await?
            .ok_or(WorkOrderError::NotFound)?;
        let motorcycle = Motorcycle::find_summary_by_id(pool, work_order.motorcycle_id)
            .await?
            .ok_or(WorkOrderError::NotFound)?;
        let customer = Customer::find_by_id(pool, work_order.customer_id)
            .await?
            .ok_or(WorkOrderError::NotFound)?;
        let mechanics = Mechanic::find_by_work_order_id(pool, id).await?;
        let parts = WorkOrderPart::find_lines_by_work_order_id(pool, id).await?;
        let invoice = Invoice::find_by_source(pool, InvoiceSource::WorkOrder(id)).await?;

        Ok(WorkOrderDetails {
            work_order,
            motorcycle,
            customer,
            mechanics,
            parts,
            invoice,
        })
    }

    /// The customer is taken from the motorcycle's owner.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateWorkOrder,
    ) -> Result<WorkOrder, WorkOrderError> {
        let data = CreateWorkOrder {
            description: clean(&data.description),
            diagnosis: clean_optional(data.diagnosis.clone()),
            ..data.clone()
        };
        let mechanic_ids = data.mechanic_ids.clone().unwrap_or_default();

        let motorcycle = Motorcycle::find_by_id(pool, data.motorcycle_id).await?;
        let mut errors = ValidationErrors::of(&data);
        errors.check(
            "motorcycle_id",
            motorcycle.is_some(),
            "The selected motorcycle is invalid.",
        );
        for mechanic_id in &mechanic_ids {
            let usable = Mechanic::find_by_id(pool, *mechanic_id)
                .await?
                .is_some_and(|m| m.active);
            errors.check(
                "mechanic_ids",
                usable,
                format!("Mechanic {} is invalid or inactive.", mechanic_id),
            );
        }
        errors.into_result()?;
        let Some(motorcycle) = motorcycle else {
            return Err(WorkOrderError::NotFound);
        };

        let mut tx = pool.begin().await?;
        let work_order =
            WorkOrder::create(&mut *tx, Uuid::new_v4(), motorcycle.customer_id, None, &data)
                .await?;
        for mechanic_id in &mechanic_ids {
            WorkOrder::assign_mechanic(&mut *tx, work_order.id, *mechanic_id).await?;
        }
        tx.commit().await?;

        info!(
            work_order_id = %work_order.id,
            motorcycle_id = %motorcycle.id,
            mechanics = mechanic_ids.len(),
            "Work order created"
        );
        Ok(work_order)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateWorkOrder,
    ) -> Result<WorkOrder, WorkOrderError> {
        Self::get(pool, id).await?;
        Self::ensure_not_invoiced(pool, id).await?;
        let data = UpdateWorkOrder {
            description: clean(&data.description),
            diagnosis: clean_optional(data.diagnosis.clone()),
            labor_hours: data.labor_hours,
        };
        ValidationErrors::of(&data).into_result()?;

        WorkOrder::update(pool, id, &data)
            .await?
            .ok_or(WorkOrderError::NotFound)
    }

    /// Starting an order that is already in progress leaves it untouched.
    pub async fn start(pool: &SqlitePool, id: Uuid) -> Result<WorkOrder, WorkOrderError> {
        let work_order = Self::get(pool, id).await?;
        match work_order.status() {
            WorkStatus::Completed => Err(WorkOrderError::InvalidState(WorkStatus::Completed)),
            WorkStatus::InProgress => Ok(work_order),
            WorkStatus::Pending => {
                let started = WorkOrder::set_progress(pool, id, Some(Utc::now()), None)
                    .await?
                    .ok_or(WorkOrderError::NotFound)?;
                info!(work_order_id = %id, "Work order started");
                Ok(started)
            }
        }
    }

    /// A pending order is started and completed in one step.
    pub async fn complete(pool: &SqlitePool, id: Uuid) -> Result<WorkOrder, WorkOrderError> {
        let work_order = Self::get(pool, id).await?;
        if work_order.status() == WorkStatus::Completed {
            return Err(WorkOrderError::InvalidState(WorkStatus::Completed));
        }
        let now = Utc::now();
        let completed =
            WorkOrder::set_progress(pool, id, Some(work_order.started_at.unwrap_or(now)), Some(now))
                .await?
                .ok_or(WorkOrderError::NotFound)?;
        info!(work_order_id = %id, "Work order completed");
        Ok(completed)
    }

    pub async fn reopen(pool: &SqlitePool, id: Uuid) -> Result<WorkOrder, WorkOrderError> {
        let work_order = Self::get(pool, id).await?;
        if work_order.status() != WorkStatus::Completed {
            return Err(WorkOrderError::InvalidState(work_order.status()));
        }
        Self::ensure_not_invoiced(pool, id).await?;
        let reopened = WorkOrder::set_progress(pool, id, work_order.started_at, None)
            .await?
            .ok_or(WorkOrderError::NotFound)?;
        info!(work_order_id = %id, "Work order reopened");
        Ok(reopened)
    }

    pub async fn assign_mechanic(
        pool: &SqlitePool,
        id: Uuid,
        mechanic_id: Uuid,
    ) -> Result<Vec<Mechanic>, WorkOrderError> {
        Self::get(pool, id).await?;
        let usable = Mechanic::find_by_id(pool, mechanic_id)
            .await?
            .is_some_and(|m| m.active);
        if !usable {
            return Err(ValidationErrors::single(
                "mechanic_id",
                "The selected mechanic is invalid or inactive.",
            )
            .into());
        }

        WorkOrder::assign_mechanic(pool, id, mechanic_id).await?;
        info!(work_order_id = %id, mechanic_id = %mechanic_id, "Mechanic assigned");
        Ok(Mechanic::find_by_work_order_id(pool, id).await?)
    }

    pub async fn unassign_mechanic(
        pool: &SqlitePool,
        id: Uuid,
        mechanic_id: Uuid,
    ) -> Result<Vec<Mechanic>, WorkOrderError> {
        Self::get(pool, id).await?;
        if WorkOrder::unassign_mechanic(pool, id, mechanic_id).await? == 0 {
            return Err(WorkOrderError::MechanicNotAssigned);
        }
        info!(work_order_id = %id, mechanic_id = %mechanic_id, "Mechanic unassigned");
        Ok(Mechanic::find_by_work_order_id(pool, id).await?)
    }

    /// Take the parts out of stock and record the line at the current unit price.
    pub async fn add_part(
        pool: &SqlitePool,
        id: Uuid,
        data: &AddWorkOrderPart,
    ) -> Result<WorkOrderPart, WorkOrderError> {
        ValidationErrors::of(data).into_result()?;

        let mut tx = pool.begin().await?;
        Self::lock_for_line_change(&mut tx, id).await?;

        let part = Part::find_by_id(&mut *tx, data.part_id)
            .await?
            .ok_or(WorkOrderError::PartNotFound)?;
        if Part::adjust_stock(&mut *tx, part.id, -data.quantity)
            .await?
            .is_none()
        {
            return Err(WorkOrderError::InsufficientStock {
                sku: part.sku,
                available: part.stock_quantity,
                requested: data.quantity,
            });
        }
        let line =
            WorkOrderPart::create(&mut *tx, id, part.id, data.quantity, part.unit_price_cents)
                .await?;
        tx.commit().await?;

        info!(
            work_order_id = %id,
            part_id = %part.id,
            quantity = data.quantity,
            "Part added to work order"
        );
        if part.stock_quantity - data.quantity <= part.reorder_level {
            warn!(part_id = %part.id, sku = %part.sku, "Part is low on stock");
        }
        Ok(line)
    }

    /// Remove a line and put its quantity back on the shelf.
    pub async fn remove_part(
        pool: &SqlitePool,
        id: Uuid,
        line_id: Uuid,
    ) -> Result<(), WorkOrderError> {
        let mut tx = pool.begin().await?;
        Self::lock_for_line_change(&mut tx, id).await?;

        let line = WorkOrderPart::find_by_id(&mut *tx, line_id)
            .await?
            .filter(|line| line.work_order_id == id)
            .ok_or(WorkOrderError::LineNotFound)?;
        WorkOrderPart::delete(&mut *tx, line.id).await?;
        Part::adjust_stock(&mut *tx, line.part_id, line.quantity).await?;
        tx.commit().await?;

        info!(work_order_id = %id, line_id = %line_id, quantity = line.quantity, "Part removed from work order");
        Ok(())
    }

    /// Deleting returns every part line to stock and frees the originating appointment.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), WorkOrderError> {
        let mut tx = pool.begin().await?;
        Self::lock_for_line_change(&mut tx, id).await?;

        let lines = WorkOrderPart::find_by_work_order_id(&mut *tx, id).await?;
        for line in &lines {
            Part::adjust_stock(&mut *tx, line.part_id, line.quantity).await?;
        }
        WorkOrder::unlink_appointments(&mut *tx, id).await?;
        WorkOrder::delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!(work_order_id = %id, restored_lines = lines.len(), "Work order deleted");
        Ok(())
    }

    async fn ensure_not_invoiced(pool: &SqlitePool, id: Uuid) -> Result<(), WorkOrderError> {
        match Invoice::find_by_source(pool, InvoiceSource::WorkOrder(id)).await? {
            Some(_) => Err(WorkOrderError::AlreadyInvoiced),
            None => Ok(()),
        }
    }

    /// Existence and invoice checks for changes that touch part lines, inside the transaction.
    async fn lock_for_line_change(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<WorkOrder, WorkOrderError> {
        let work_order = WorkOrder::find_by_id(&mut **tx, id)
            .await?
            .ok_or(WorkOrderError::NotFound)?;
        if Invoice::find_by_source(&mut **tx, InvoiceSource::WorkOrder(id))
            .await?
            .is_some()
        {
            return Err(WorkOrderError::AlreadyInvoiced);
        }
        Ok(work_order)
    }
}
