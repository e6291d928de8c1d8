use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::pagination::{Page, PageRequest};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Paid,
}

/// Money breakdown of an invoice, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct InvoiceAmounts {
    pub parts_total_cents: i64,
    pub labor_hours: f64,
    pub hourly_rate_cents: i64,
    pub labor_total_cents: i64,
    pub total_cents: i64,
}

impl InvoiceAmounts {
    /// Parts plus labor, where labor is hours times the hourly rate rounded to the nearest cent.
    pub fn calculate(parts_total_cents: i64, labor_hours: f64, hourly_rate_cents: i64) -> Self {
        let labor_total_cents = (labor_hours * hourly_rate_cents as f64).round() as i64;
        Self {
            parts_total_cents,
            labor_hours,
            hourly_rate_cents,
            labor_total_cents,
            total_cents: parts_total_cents + labor_total_cents,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub work_order_id: Option<Uuid>,
    pub work_session_id: Option<Uuid>,
    pub parts_total_cents: i64,
    pub labor_hours: f64,
    pub hourly_rate_cents: i64,
    pub labor_total_cents: i64,
    pub total_cents: i64,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InvoiceSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub invoice: Invoice,
    pub customer_name: String,
    pub customer_email: String,
}

impl std::ops::Deref for InvoiceSummary {
    type Target = Invoice;
    fn deref(&self) -> &Self::Target {
        &self.invoice
    }
}

/// What an invoice is billed for. Exactly one per invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceSource {
    WorkOrder(Uuid),
    WorkSession(Uuid),
}

pub struct NewInvoice {
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub source: InvoiceSource,
    pub amounts: InvoiceAmounts,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
}

const SUMMARY_SELECT: &str = r#"SELECT i.*,
       c.first_name || ' ' || c.last_name AS customer_name,
       c.email AS customer_email
  FROM invoices i
  JOIN customers c ON c.id = i.customer_id"#;

impl Invoice {
    pub fn amounts(&self) -> InvoiceAmounts {
        InvoiceAmounts {
            parts_total_cents: self.parts_total_cents,
            labor_hours: self.labor_hours,
            hourly_rate_cents: self.hourly_rate_cents,
            labor_total_cents: self.labor_total_cents,
            total_cents: self.total_cents,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Unpaid && self.due_at < now
    }

    /// Format `<prefix>-<year>-<sequence>` with a zero-padded sequence.
    pub fn format_number(prefix: &str, year: i32, sequence: i64) -> String {
        format!("{}-{}-{:05}", prefix, year, sequence)
    }

    /// Next invoice number for the year of `issued_at`: one past the highest
    /// sequence already issued under `<prefix>-<year>-`. Deleted invoices leave
    /// gaps that are never reused.
    pub async fn next_number<'e, E>(
        executor: E,
        prefix: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let year = issued_at.year();
        // Exact prefix comparison; LIKE would treat `_` and `%` in the prefix as wildcards.
        let highest: i64 = sqlx::query_scalar(
            r#"SELECT COALESCE(MAX(CAST(substr(invoice_number, length($1) + 1) AS INTEGER)), 0)
               FROM invoices
               WHERE substr(invoice_number, 1, length($1)) = $1"#,
        )
        .bind(format!("{}-{}-", prefix, year))
        .fetch_one(executor)
        .await?;
        Ok(Self::format_number(prefix, year, highest + 1))
    }

    pub async fn find_page(
        pool: &SqlitePool,
        request: &PageRequest,
        filter: &InvoiceFilter,
    ) -> Result<Page<InvoiceSummary>, sqlx::Error> {
        let pattern = request.like_pattern();
        let where_clause = r#"WHERE ($1 IS NULL OR i.invoice_number LIKE $1 OR c.last_name LIKE $1 OR c.email LIKE $1)
                                AND ($2 IS NULL OR i.status = $2)
                                AND ($3 IS NULL OR i.customer_id = $3)"#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM invoices i JOIN customers c ON c.id = i.customer_id {where_clause}"
        ))
        .bind(&pattern)
        .bind(filter.status)
        .bind(filter.customer_id)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, InvoiceSummary>(&format!(
            "{SUMMARY_SELECT} {where_clause} ORDER BY i.issued_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&pattern)
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(request.per_page())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<InvoiceSummary>, sqlx::Error> {
        sqlx::query_as::<_, InvoiceSummary>(&format!("{SUMMARY_SELECT} WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_source<'e, E>(
        executor: E,
        source: InvoiceSource,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (work_order_id, work_session_id) = match source {
            InvoiceSource::WorkOrder(id) => (Some(id), None),
            InvoiceSource::WorkSession(id) => (None, Some(id)),
        };
        sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE work_order_id = $1 OR work_session_id = $2",
        )
        .bind(work_order_id)
        .bind(work_session_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_customer_id(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE customer_id = $1 ORDER BY issued_at DESC",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create<'e, E>(executor: E, data: &NewInvoice) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (work_order_id, work_session_id) = match data.source {
            InvoiceSource::WorkOrder(id) => (Some(id), None),
            InvoiceSource::WorkSession(id) => (None, Some(id)),
        };
        sqlx::query_as::<_, Invoice>(
            r#"INSERT INTO invoices (id, invoice_number, customer_id, work_order_id, work_session_id,
                                     parts_total_cents, labor_hours, hourly_rate_cents, labor_total_cents, total_cents,
                                     status, notes, issued_at, due_at, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $13, $13)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.invoice_number)
        .bind(data.customer_id)
        .bind(work_order_id)
        .bind(work_session_id)
        .bind(data.amounts.parts_total_cents)
        .bind(data.amounts.labor_hours)
        .bind(data.amounts.hourly_rate_cents)
        .bind(data.amounts.labor_total_cents)
        .bind(data.amounts.total_cents)
        .bind(InvoiceStatus::Unpaid)
        .bind(&data.notes)
        .bind(data.issued_at)
        .bind(data.due_at)
        .fetch_one(executor)
        .await
    }

    /// Flip an unpaid invoice to paid. Returns `None` if it is missing or already paid.
    pub async fn mark_paid(
        pool: &SqlitePool,
        id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET status = $2, paid_at = $3, updated_at = $3
               WHERE id = $1 AND status = $4
               RETURNING *"#,
        )
        .bind(id)
        .bind(InvoiceStatus::Paid)
        .bind(paid_at)
        .bind(InvoiceStatus::Unpaid)
        .fetch_optional(pool)
        .await
    }

    pub async fn outstanding_total_cents(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(SUM(total_cents), 0) FROM invoices WHERE status = 'unpaid'")
            .fetch_one(pool)
            .await
    }

    pub async fn count_by_status(
        pool: &SqlitePool,
        status: InvoiceStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn count_overdue(pool: &SqlitePool, now: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE status = 'unpaid' AND due_at < $1")
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Sum of invoices paid within `[from, to)`.
    pub async fn paid_total_between(
        pool: &SqlitePool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(total_cents), 0) FROM invoices
               WHERE status = 'paid' AND paid_at >= $1 AND paid_at < $2"#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
