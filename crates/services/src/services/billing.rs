//! Invoice generation from finished work, payment tracking and the money summary.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use db::{
    models::{
        invoice::{
            Invoice, InvoiceAmounts, InvoiceFilter, InvoiceSource, InvoiceStatus, InvoiceSummary,
            NewInvoice,
        },
        work_order::{WorkOrder, WorkOrderPart, WorkOrderPartLine, WorkOrderSummary},
        work_session::{WorkSession, WorkSessionSummary},
        work_status::WorkStatus,
    },
    pagination::{Page, PageRequest},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use super::{
    config::Config,
    validation::{ValidationErrors, clean_optional},
};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("invoice not found")]
    NotFound,
    #[error("work order not found")]
    WorkOrderNotFound,
    #[error("work session not found")]
    WorkSessionNotFound,
    #[error("work must be completed before invoicing, it is {0}")]
    NotCompleted(WorkStatus),
    #[error("already invoiced as {0}")]
    AlreadyInvoiced(String),
    #[error("invoice is already paid")]
    AlreadyPaid,
    #[error("paid invoices cannot be deleted")]
    PaidInvoiceLocked,
}

/// Optional overrides submitted with an invoice generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, Validate)]
pub struct GenerateInvoice {
    #[validate(range(min = 0, max = 1_000_000))]
    pub hourly_rate_cents: Option<i64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct InvoiceDetails {
    pub invoice: InvoiceSummary,
    pub work_order: Option<WorkOrderSummary>,
    pub work_session: Option<WorkSessionSummary>,
    pub part_lines: Vec<WorkOrderPartLine>,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct FinancialSummary {
    pub outstanding_total_cents: i64,
    pub paid_this_month_cents: i64,
    pub unpaid_count: i64,
    pub paid_count: i64,
    pub overdue_count: i64,
}

/// `[first instant of the month, first instant of the next month)` around `now`.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    (start, end)
}

pub struct BillingService;

impl BillingService {
    pub async fn list(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &InvoiceFilter,
    ) -> Result<Page<InvoiceSummary>, BillingError> {
        Ok(Invoice::find_page(pool, request, filter).await?)
    }

    pub async fn details(pool: &SqlitePool, id: Uuid) -> Result<InvoiceDetails, BillingError> {
        let invoice = Invoice::find_summary_by_id(pool, id)
            .await?
            .ok_or(BillingError::NotFound)?;

        let (work_order, part_lines) = match invoice.work_order_id {
            Some(work_order_id) => (
                WorkOrder::find_summary_by_id(pool, work_order_id).await?,
                WorkOrderPart::find_lines_by_work_order_id(pool, work_order_id).await?,
            ),
            None => (None, Vec::new()),
        };
        let work_session = match invoice.work_session_id {
            Some(session_id) => WorkSession::find_summary_by_id(pool, session_id).await?,
            None => None,
        };
        let overdue = invoice.is_overdue(Utc::now());

        Ok(InvoiceDetails {
            invoice,
            work_order,
            work_session,
            part_lines,
            overdue,
        })
    }

    pub async fn generate_from_work_order(
        pool: &SqlitePool,
        work_order_id: Uuid,
        request: &GenerateInvoice,
        config: &Config,
    ) -> Result<Invoice, BillingError> {
        let (rate, notes) = Self::validate_request(request, config)?;
        let mut tx = pool.begin().await?;

        let work_order = WorkOrder::find_by_id(&mut *tx, work_order_id)
            .await?
            .ok_or(BillingError::WorkOrderNotFound)?;
        if work_order.status() != WorkStatus::Completed {
            return Err(BillingError::NotCompleted(work_order.status()));
        }
        let source = InvoiceSource::WorkOrder(work_order_id);
        if let Some(existing) = Invoice::find_by_source(&mut *tx, source).await? {
            return Err(BillingError::AlreadyInvoiced(existing.invoice_number));
        }

        let parts_total = WorkOrder::parts_total_cents(&mut *tx, work_order_id).await?;
        let issued_at = Utc::now();
        let invoice_number = Invoice::next_number(&mut *tx, &config.invoice_prefix, issued_at).await?;
        let invoice = Invoice::create(
            &mut *tx,
            &NewInvoice {
                invoice_number,
                customer_id: work_order.customer_id,
                source,
                amounts: InvoiceAmounts::calculate(parts_total, work_order.labor_hours, rate),
                notes,
                issued_at,
                due_at: issued_at + Duration::days(config.invoice_due_days),
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            work_order_id = %work_order_id,
            total_cents = invoice.total_cents,
            "Invoice generated"
        );
        Ok(invoice)
    }

    /// Sessions carry no parts, so the invoice is labor only.
    pub async fn generate_from_work_session(
        pool: &SqlitePool,
        work_session_id: Uuid,
        request: &GenerateInvoice,
        config: &Config,
    ) -> Result<Invoice, BillingError> {
        let (rate, notes) = Self::validate_request(request, config)?;
        let mut tx = pool.begin().await?;

        let session = WorkSession::find_by_id(&mut *tx, work_session_id)
            .await?
            .ok_or(BillingError::WorkSessionNotFound)?;
        if session.status() != WorkStatus::Completed {
            return Err(BillingError::NotCompleted(session.status()));
        }
        let source = InvoiceSource::WorkSession(work_session_id);
        if let Some(existing) = Invoice::find_by_source(&mut *tx, source).await? {
            return Err(BillingError::AlreadyInvoiced(existing.invoice_number));
        }

        let issued_at = Utc::now();
        let invoice_number = Invoice::next_number(&mut *tx, &config.invoice_prefix, issued_at).await?;
        let invoice = Invoice::create(
            &mut *tx,
            &NewInvoice {
                invoice_number,
                customer_id: session.customer_id,
                source,
                amounts: InvoiceAmounts::calculate(0, session.labor_hours, rate),
                notes,
                issued_at,
                due_at: issued_at + Duration::days(config.invoice_due_days),
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            work_session_id = %work_session_id,
            total_cents = invoice.total_cents,
            "Invoice generated"
        );
        Ok(invoice)
    }

    pub async fn mark_paid(pool: &SqlitePool, id: Uuid) -> Result<Invoice, BillingError> {
        match Invoice::mark_paid(pool, id, Utc::now()).await? {
            Some(invoice) => {
                info!(invoice_id = %id, invoice_number = %invoice.invoice_number, "Invoice paid");
                Ok(invoice)
            }
            None => match Invoice::find_by_id(pool, id).await? {
                Some(_) => Err(BillingError::AlreadyPaid),
                None => Err(BillingError::NotFound),
            },
        }
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), BillingError> {
        let invoice = Invoice::find_by_id(pool, id)
            .await?
            .ok_or(BillingError::NotFound)?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(BillingError::PaidInvoiceLocked);
        }
        Invoice::delete(pool, id).await?;
        info!(invoice_id = %id, invoice_number = %invoice.invoice_number, "Invoice deleted");
        Ok(())
    }

    pub async fn summary(pool: &SqlitePool) -> Result<FinancialSummary, BillingError> {
        let now = Utc::now();
        let (month_start, month_end) = month_bounds(now);
        Ok(FinancialSummary {
            outstanding_total_cents: Invoice::outstanding_total_cents(pool).await?,
            paid_this_month_cents: Invoice::paid_total_between(pool, month_start, month_end)
                .await?,
            unpaid_count: Invoice::count_by_status(pool, InvoiceStatus::Unpaid).await?,
            paid_count: Invoice::count_by_status(pool, InvoiceStatus::Paid).await?,
            overdue_count: Invoice::count_overdue(pool, now).await?,
        })
    }

    fn validate_request(
        request: &GenerateInvoice,
        config: &Config,
    ) -> Result<(i64, Option<String>), BillingError> {
        let request = GenerateInvoice {
            hourly_rate_cents: request.hourly_rate_cents,
            notes: clean_optional(request.notes.clone()),
        };
        ValidationErrors::of(&request).into_result()?;
        let rate = request
            .hourly_rate_cents
            .unwrap_or(config.default_hourly_rate_cents);
        Ok((rate, request.notes))
    }
}
