use chrono::Utc;
use db::{
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentSummary},
        mechanic::{CreateMechanic, Mechanic, UpdateMechanic},
        work_order::{WorkOrder, WorkOrderSummary},
    },
    pagination::{Page, PageRequest},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationErrors, clean, clean_optional};

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("mechanic not found")]
    NotFound,
    #[error("mechanic has open work orders or upcoming appointments")]
    ActiveAssignments,
    #[error("mechanic has service history; deactivate instead of deleting")]
    HasHistory,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MechanicOverview {
    pub mechanic: Mechanic,
    pub open_work_orders: Vec<WorkOrderSummary>,
    pub upcoming_appointments: Vec<AppointmentSummary>,
}

pub struct MechanicService;

impl MechanicService {
    pub async fn list(
        pool: &SqlitePool,
        request: &PageRequest,
        active_only: bool,
    ) -> Result<Page<Mechanic>, StaffError> {
        Ok(Mechanic::find_page(pool, request, active_only).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Mechanic, StaffError> {
        Mechanic::find_by_id(pool, id)
            .await?
            .ok_or(StaffError::NotFound)
    }

    pub async fn overview(pool: &SqlitePool, id: Uuid) -> Result<MechanicOverview, StaffError> {
        let mechanic = Self::get(pool, id).await?;
        let open_work_orders = WorkOrder::find_open_by_mechanic_id(pool, id).await?;
        let upcoming_appointments = Appointment::find_filtered(
            pool,
            &AppointmentFilter {
                from: Some(Utc::now()),
                mechanic_id: Some(id),
                ..Default::default()
            },
        )
        .await?
        .into_iter()
        .filter(|a| a.appointment.status.is_pending())
        .collect();

        Ok(MechanicOverview {
            mechanic,
            open_work_orders,
            upcoming_appointments,
        })
    }

    pub async fn create(pool: &SqlitePool, data: &CreateMechanic) -> Result<Mechanic, StaffError> {
        let data = Self::validate(pool, data, None).await?;
        let mechanic = Mechanic::create(pool, &data, Uuid::new_v4()).await?;
        info!(mechanic_id = %mechanic.id, "Mechanic created");
        Ok(mechanic)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMechanic,
    ) -> Result<Mechanic, StaffError> {
        Self::get(pool, id).await?;
        let data = Self::validate(pool, data, Some(id)).await?;
        Mechanic::update(pool, id, &data)
            .await?
            .ok_or(StaffError::NotFound)
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        active: bool,
    ) -> Result<Mechanic, StaffError> {
        let mechanic = Mechanic::set_active(pool, id, active)
            .await?
            .ok_or(StaffError::NotFound)?;
        info!(mechanic_id = %id, active, "Mechanic availability changed");
        Ok(mechanic)
    }

    /// Only mechanics that never worked on anything can be removed outright.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), StaffError> {
        Self::get(pool, id).await?;

        let open = Mechanic::count_open_work_orders(pool, id).await?
            + Appointment::count_upcoming_for_mechanic(pool, id, Utc::now()).await?;
        if open > 0 {
            return Err(StaffError::ActiveAssignments);
        }
        if Mechanic::count_references(pool, id).await? > 0 {
            return Err(StaffError::HasHistory);
        }

        Mechanic::delete(pool, id).await?;
        info!(mechanic_id = %id, "Mechanic deleted");
        Ok(())
    }

    async fn validate(
        pool: &SqlitePool,
        data: &CreateMechanic,
        existing_id: Option<Uuid>,
    ) -> Result<CreateMechanic, StaffError> {
        let data = CreateMechanic {
            first_name: clean(&data.first_name),
            last_name: clean(&data.last_name),
            email: clean(&data.email).to_lowercase(),
            phone: clean_optional(data.phone.clone()),
            specialization: clean_optional(data.specialization.clone()),
            hourly_rate_cents: data.hourly_rate_cents,
        };

        let email_taken = match Mechanic::find_by_email(pool, &data.email).await? {
            Some(other) => Some(other.id) != existing_id,
            None => false,
        };

        let mut errors = ValidationErrors::of(&data);
        errors.check("email", !email_taken, "The email has already been taken.");
        errors.into_result()?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use db::models::appointment::CreateAppointment;

    use super::*;
    use crate::services::test_support;

    #[tokio::test]
    async fn test_rejects_negative_rate() {
        let pool = test_support::pool().await;
        let data = CreateMechanic {
            first_name: "Sam".to_string(),
            last_name: "Wrench".to_string(),
            email: "sam@shop.example".to_string(),
            phone: None,
            specialization: None,
            hourly_rate_cents: -100,
        };
        let err = MechanicService::create(&pool, &data).await.unwrap_err();
        assert!(matches!(err, StaffError::Validation(ref v) if v.has("hourly_rate_cents")));
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_active_list() {
        let pool = test_support::pool().await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        test_support::mechanic(&pool, "kim@shop.example").await;

        let updated = MechanicService::set_active(&pool, mechanic.id, false)
            .await
            .unwrap();
        assert!(!updated.active);

        let active = MechanicService::list(&pool, &PageRequest::default(), true)
            .await
            .unwrap();
        assert_eq!(active.total, 1);
        assert!(active.items.iter().all(|m| m.id != mechanic.id));
    }

    #[tokio::test]
    async fn test_delete_unused_mechanic() {
        let pool = test_support::pool().await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        MechanicService::delete(&pool, mechanic.id).await.unwrap();
        assert!(matches!(
            MechanicService::get(&pool, mechanic.id).await,
            Err(StaffError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_upcoming_appointment() {
        let pool = test_support::pool().await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        let booking = CreateAppointment {
            customer_id: customer.id,
            motorcycle_id: motorcycle.id,
            mechanic_id: Some(mechanic.id),
            scheduled_at: test_support::at(3, 9, 0),
            duration_minutes: Some(60),
            service_type: "Tyre change".to_string(),
            notes: None,
        };
        Appointment::create(&pool, Uuid::new_v4(), &booking, 60)
            .await
            .unwrap();

        let err = MechanicService::delete(&pool, mechanic.id).await.unwrap_err();
        assert!(matches!(err, StaffError::ActiveAssignments));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_history() {
        let pool = test_support::pool().await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        let work_order = test_support::work_order(&pool, &motorcycle).await;
        WorkOrder::assign_mechanic(&pool, work_order.id, mechanic.id)
            .await
            .unwrap();
        WorkOrder::set_progress(&pool, work_order.id, Some(Utc::now()), Some(Utc::now()))
            .await
            .unwrap();

        let err = MechanicService::delete(&pool, mechanic.id).await.unwrap_err();
        assert!(matches!(err, StaffError::HasHistory));
    }
}
