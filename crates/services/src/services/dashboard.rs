use chrono::{DateTime, Duration, Utc};
use db::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentSummary},
    customer::Customer,
    invoice::Invoice,
    motorcycle::Motorcycle,
    part::Part,
    work_order::WorkOrder,
};
use serde::Serialize;
use sqlx::SqlitePool;
use ts_rs::TS;

use super::billing::month_bounds;

#[derive(Debug, Clone, Serialize, TS)]
pub struct DashboardStats {
    pub customers: i64,
    pub motorcycles: i64,
    /// Pending plus in progress.
    pub open_work_orders: i64,
    pub appointments_today: i64,
    pub low_stock_parts: i64,
    pub outstanding_total_cents: i64,
    pub revenue_this_month_cents: i64,
    pub todays_schedule: Vec<AppointmentSummary>,
}

pub struct DashboardService;

impl DashboardService {
    pub async fn stats(pool: &SqlitePool) -> Result<DashboardStats, sqlx::Error> {
        Self::stats_at(pool, Utc::now()).await
    }

    pub async fn stats_at(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, sqlx::Error> {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now);
        let day_end = day_start + Duration::days(1);
        let (month_start, month_end) = month_bounds(now);

        let todays_schedule = Appointment::find_filtered(
            pool,
            &AppointmentFilter {
                from: Some(day_start),
                to: Some(day_end),
                ..Default::default()
            },
        )
        .await?;

        Ok(DashboardStats {
            customers: Customer::count(pool).await?,
            motorcycles: Motorcycle::count(pool).await?,
            open_work_orders: WorkOrder::count_open(pool).await?,
            appointments_today: Appointment::count_between(pool, day_start, day_end).await?,
            low_stock_parts: Part::count_low_stock(pool).await?,
            outstanding_total_cents: Invoice::outstanding_total_cents(pool).await?,
            revenue_this_month_cents: Invoice::paid_total_between(pool, month_start, month_end)
                .await?,
            todays_schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::models::appointment::CreateAppointment;
    use uuid::Uuid;

    use super::*;
    use crate::services::{test_support, work_orders::WorkOrderService};

    #[tokio::test]
    async fn test_counts() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        let open = test_support::work_order(&pool, &motorcycle).await;
        let done = test_support::work_order(&pool, &motorcycle).await;
        WorkOrderService::start(&pool, open.id).await.unwrap();
        WorkOrderService::complete(&pool, done.id).await.unwrap();
        let supplier = test_support::supplier(&pool).await;
        test_support::part(&pool, supplier.id, 1_000, 1).await;

        let booking = CreateAppointment {
            customer_id: customer.id,
            motorcycle_id: motorcycle.id,
            mechanic_id: None,
            scheduled_at: test_support::at(4, 10, 0),
            duration_minutes: Some(60),
            service_type: "Inspection".to_string(),
            notes: None,
        };
        Appointment::create(&pool, Uuid::new_v4(), &booking, 60)
            .await
            .unwrap();

        let stats = DashboardService::stats_at(&pool, test_support::at(4, 8, 0))
            .await
            .unwrap();
        assert_eq!(stats.customers, 1);
        assert_eq!(stats.motorcycles, 1);
        assert_eq!(stats.open_work_orders, 1);
        assert_eq!(stats.appointments_today, 1);
        assert_eq!(stats.todays_schedule.len(), 1);
        assert_eq!(stats.low_stock_parts, 1);
        assert_eq!(stats.outstanding_total_cents, 0);

        let next_day = DashboardService::stats_at(&pool, test_support::at(5, 8, 0))
            .await
            .unwrap();
        assert_eq!(next_day.appointments_today, 0);
    }
}
