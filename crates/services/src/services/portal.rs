//! Read views and self-service booking scoped to a single customer.
//!
//! Anything that does not belong to the customer answers `NotFound`, the same as a record
//! that does not exist.

use chrono::{DateTime, Utc};
use db::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentSummary, CreateAppointment},
    customer::Customer,
    invoice::Invoice,
    motorcycle::{Motorcycle, MotorcycleSummary},
    work_order::{WorkOrder, WorkOrderSummary},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    billing::{BillingError, BillingService, InvoiceDetails},
    scheduling::{SchedulingError, SchedulingService},
    work_orders::{WorkOrderDetails, WorkOrderError, WorkOrderService},
};

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("customer not found")]
    CustomerNotFound,
    #[error("record not found")]
    NotFound,
    #[error("only upcoming appointments can be cancelled")]
    NotUpcoming,
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error(transparent)]
    WorkOrder(#[from] WorkOrderError),
    #[error(transparent)]
    Billing(#[from] BillingError),
}

/// Booking request from the customer; the shop assigns the mechanic later.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PortalBooking {
    pub motorcycle_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub service_type: String,
    pub notes: Option<String>,
}

pub struct PortalService;

impl PortalService {
    pub async fn customer(pool: &SqlitePool, customer_id: Uuid) -> Result<Customer, PortalError> {
        Customer::find_by_id(pool, customer_id)
            .await?
            .ok_or(PortalError::CustomerNotFound)
    }

    pub async fn motorcycles(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<MotorcycleSummary>, PortalError> {
        Self::customer(pool, customer_id).await?;
        Ok(Motorcycle::find_by_customer_id(pool, customer_id).await?)
    }

    pub async fn appointments(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<AppointmentSummary>, PortalError> {
        Self::customer(pool, customer_id).await?;
        Ok(Appointment::find_filtered(
            pool,
            &AppointmentFilter {
                customer_id: Some(customer_id),
                ..Default::default()
            },
        )
        .await?)
    }

    pub async fn work_orders(
        pool: &SqlitePool,
        customer_id: Uuid,
    ) -> Result<Vec<WorkOrderSummary>, PortalError> {
        Self::customer(pool, customer_id).await?;
        Ok(WorkOrder::find_by_customer_id(pool, customer_id).await?)
    }

    pub async fn work_order(
        pool: &SqlitePool,
        customer_id: Uuid,
        work_order_id: Uuid,
    ) -> Result<WorkOrderDetails, PortalError> {
        Self::customer(pool, customer_id).await?;
        let owned = WorkOrder::find_by_id(pool, work_order_id)
            .await?
            .is_some_and(|wo| wo.customer_id == customer_id);
        if !owned {
            return Err(PortalError::NotFound);
        }
        Ok(WorkOrderService::details(pool, work_order_id).await?)
    }

    pub async fn invoices(pool: &SqlitePool, customer_id: Uuid) -> Result<Vec<Invoice>, PortalError> {
        Self::customer(pool, customer_id).await?;
        Ok(Invoice::find_by_customer_id(pool, customer_id).await?)
    }

    pub async fn invoice(
        pool: &SqlitePool,
        customer_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetails, PortalError> {
        Self::customer(pool, customer_id).await?;
        let owned = Invoice::find_by_id(pool, invoice_id)
            .await?
            .is_some_and(|invoice| invoice.customer_id == customer_id);
        if !owned {
            return Err(PortalError::NotFound);
        }
        Ok(BillingService::details(pool, invoice_id).await?)
    }

    pub async fn book(
        pool: &SqlitePool,
        customer_id: Uuid,
        booking: &PortalBooking,
        default_duration_minutes: i32,
    ) -> Result<Appointment, PortalError> {
        Self::customer(pool, customer_id).await?;
        let owned = Motorcycle::find_by_id(pool, booking.motorcycle_id)
            .await?
            .is_some_and(|m| m.customer_id == customer_id);
        if !owned {
            return Err(PortalError::NotFound);
        }

        let data = CreateAppointment {
            customer_id,
            motorcycle_id: booking.motorcycle_id,
            mechanic_id: None,
            scheduled_at: booking.scheduled_at,
            duration_minutes: booking.duration_minutes,
            service_type: booking.service_type.clone(),
            notes: booking.notes.clone(),
        };
        let appointment = SchedulingService::book(pool, &data, default_duration_minutes).await?;
        info!(customer_id = %customer_id, appointment_id = %appointment.id, "Appointment booked from portal");
        Ok(appointment)
    }

    pub async fn cancel(
        pool: &SqlitePool,
        customer_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, PortalError> {
        Self::cancel_at(pool, customer_id, appointment_id, Utc::now()).await
    }

    async fn cancel_at(
        pool: &SqlitePool,
        customer_id: Uuid,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, PortalError> {
        Self::customer(pool, customer_id).await?;
        let appointment = Appointment::find_by_id(pool, appointment_id)
            .await?
            .filter(|a| a.customer_id == customer_id)
            .ok_or(PortalError::NotFound)?;
        if appointment.scheduled_at <= now {
            return Err(PortalError::NotUpcoming);
        }
        Ok(SchedulingService::cancel(pool, appointment_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use db::models::appointment::AppointmentStatus;

    use super::*;
    use crate::services::test_support;

    fn booking_for(motorcycle_id: Uuid) -> PortalBooking {
        PortalBooking {
            motorcycle_id,
            scheduled_at: test_support::at(12, 14, 0),
            duration_minutes: None,
            service_type: "First service".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_views_never_leak_other_customers() {
        let pool = test_support::pool().await;
        let alice = test_support::customer(&pool, "alice@example.com").await;
        let bob = test_support::customer(&pool, "bob@example.com").await;
        let alice_bike = test_support::motorcycle(&pool, alice.id).await;
        let bob_bike = test_support::motorcycle(&pool, bob.id).await;
        let bob_order = test_support::work_order(&pool, &bob_bike).await;
        test_support::work_order(&pool, &alice_bike).await;

        let bikes = PortalService::motorcycles(&pool, alice.id).await.unwrap();
        assert_eq!(bikes.len(), 1);
        assert_eq!(bikes[0].id, alice_bike.id);

        let orders = PortalService::work_orders(&pool, alice.id).await.unwrap();
        assert!(orders.iter().all(|wo| wo.customer_id == alice.id));

        assert!(matches!(
            PortalService::work_order(&pool, alice.id, bob_order.id).await,
            Err(PortalError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_book_only_own_motorcycle() {
        let pool = test_support::pool().await;
        let alice = test_support::customer(&pool, "alice@example.com").await;
        let bob = test_support::customer(&pool, "bob@example.com").await;
        let alice_bike = test_support::motorcycle(&pool, alice.id).await;
        let bob_bike = test_support::motorcycle(&pool, bob.id).await;

        assert!(matches!(
            PortalService::book(&pool, alice.id, &booking_for(bob_bike.id), 60).await,
            Err(PortalError::NotFound)
        ));

        let appointment = PortalService::book(&pool, alice.id, &booking_for(alice_bike.id), 60)
            .await
            .unwrap();
        assert_eq!(appointment.customer_id, alice.id);
        assert_eq!(appointment.mechanic_id, None);
        assert_eq!(appointment.duration_minutes, 60);
    }

    #[tokio::test]
    async fn test_cancel_upcoming_only() {
        let pool = test_support::pool().await;
        let alice = test_support::customer(&pool, "alice@example.com").await;
        let bob = test_support::customer(&pool, "bob@example.com").await;
        let alice_bike = test_support::motorcycle(&pool, alice.id).await;
        let appointment = PortalService::book(&pool, alice.id, &booking_for(alice_bike.id), 60)
            .await
            .unwrap();

        assert!(matches!(
            PortalService::cancel(&pool, bob.id, appointment.id).await,
            Err(PortalError::NotFound)
        ));
        assert!(matches!(
            PortalService::cancel_at(&pool, alice.id, appointment.id, test_support::at(12, 15, 0))
                .await,
            Err(PortalError::NotUpcoming)
        ));

        let cancelled = PortalService::cancel_at(
            &pool,
            alice.id,
            appointment.id,
            test_support::at(11, 9, 0),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let pool = test_support::pool().await;
        assert!(matches!(
            PortalService::invoices(&pool, Uuid::new_v4()).await,
            Err(PortalError::CustomerNotFound)
        ));
    }
}
