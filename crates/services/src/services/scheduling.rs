//! Appointment calendar: booking, rescheduling, state changes and conversion into work orders.

use chrono::{DateTime, Duration, Utc};
use db::models::{
    appointment::{
        Appointment, AppointmentFilter, AppointmentStatus, AppointmentSummary, CreateAppointment,
        UpdateAppointment,
    },
    customer::Customer,
    mechanic::Mechanic,
    motorcycle::Motorcycle,
    work_order::{CreateWorkOrder, WorkOrder},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::validation::{ValidationErrors, clean, clean_optional};

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("appointment not found")]
    NotFound,
    #[error("mechanic already has an overlapping appointment ({0})")]
    MechanicUnavailable(Uuid),
    #[error("appointment is {0}")]
    InvalidState(AppointmentStatus),
    #[error("appointment was already converted into work order {0}")]
    AlreadyConverted(Uuid),
}

pub struct SchedulingService;

impl SchedulingService {
    /// Appointments starting within `[from, to)`, narrowed by the other filter fields.
    pub async fn calendar(
        pool: &SqlitePool,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentSummary>, SchedulingError> {
        Ok(Appointment::find_filtered(pool, filter).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<AppointmentSummary, SchedulingError> {
        Appointment::find_summary_by_id(pool, id)
            .await?
            .ok_or(SchedulingError::NotFound)
    }

    pub async fn book(
        pool: &SqlitePool,
        data: &CreateAppointment,
        default_duration_minutes: i32,
    ) -> Result<Appointment, SchedulingError> {
        let duration = data.duration_minutes.unwrap_or(default_duration_minutes);
        let data = CreateAppointment {
            service_type: clean(&data.service_type),
            notes: clean_optional(data.notes.clone()),
            duration_minutes: Some(duration),
            ..data.clone()
        };

        Self::validate_booking(
            pool,
            ValidationErrors::of(&data),
            data.customer_id,
            data.motorcycle_id,
            data.mechanic_id,
        )
        .await?;
        if let Some(mechanic_id) = data.mechanic_id {
            Self::ensure_mechanic_free(pool, mechanic_id, data.scheduled_at, duration, None)
                .await?;
        }

        let appointment = Appointment::create(pool, Uuid::new_v4(), &data, duration).await?;
        info!(
            appointment_id = %appointment.id,
            customer_id = %appointment.customer_id,
            scheduled_at = %appointment.scheduled_at,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Reschedule or edit a pending appointment. Owner and motorcycle are fixed.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateAppointment,
    ) -> Result<Appointment, SchedulingError> {
        let existing = Self::find_pending(pool, id).await?;
        let data = UpdateAppointment {
            service_type: clean(&data.service_type),
            notes: clean_optional(data.notes.clone()),
            ..data.clone()
        };

        Self::validate_booking(
            pool,
            ValidationErrors::of(&data),
            existing.customer_id,
            existing.motorcycle_id,
            data.mechanic_id,
        )
        .await?;
        if let Some(mechanic_id) = data.mechanic_id {
            Self::ensure_mechanic_free(
                pool,
                mechanic_id,
                data.scheduled_at,
                data.duration_minutes,
                Some(id),
            )
            .await?;
        }

        let appointment = Appointment::update(pool, id, &data)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        info!(appointment_id = %id, scheduled_at = %appointment.scheduled_at, "Appointment updated");
        Ok(appointment)
    }

    pub async fn confirm(pool: &SqlitePool, id: Uuid) -> Result<Appointment, SchedulingError> {
        Self::transition(pool, id, AppointmentStatus::Confirmed).await
    }

    pub async fn cancel(pool: &SqlitePool, id: Uuid) -> Result<Appointment, SchedulingError> {
        Self::transition(pool, id, AppointmentStatus::Cancelled).await
    }

    /// Close the appointment without opening a work order.
    pub async fn complete(pool: &SqlitePool, id: Uuid) -> Result<Appointment, SchedulingError> {
        Self::transition(pool, id, AppointmentStatus::Completed).await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), SchedulingError> {
        let appointment = Appointment::find_by_id(pool, id)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        if let Some(work_order_id) = appointment.work_order_id {
            return Err(SchedulingError::AlreadyConverted(work_order_id));
        }
        Appointment::delete(pool, id).await?;
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    /// Open a work order for the appointment and close the appointment, atomically.
    pub async fn create_work_order(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<WorkOrder, SchedulingError> {
        let mut tx = pool.begin().await?;

        let appointment = Appointment::find_by_id(&mut *tx, id)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        if let Some(work_order_id) = appointment.work_order_id {
            return Err(SchedulingError::AlreadyConverted(work_order_id));
        }
        if !appointment.status.is_pending() {
            return Err(SchedulingError::InvalidState(appointment.status));
        }

        let description = match &appointment.notes {
            Some(notes) => format!("{}: {}", appointment.service_type, notes),
            None => appointment.service_type.clone(),
        };
        let data = CreateWorkOrder {
            motorcycle_id: appointment.motorcycle_id,
            description,
            diagnosis: None,
            labor_hours: None,
            mechanic_ids: None,
        };
        let work_order = WorkOrder::create(
            &mut *tx,
            Uuid::new_v4(),
            appointment.customer_id,
            Some(appointment.id),
            &data,
        )
        .await?;
        if let Some(mechanic_id) = appointment.mechanic_id {
            WorkOrder::assign_mechanic(&mut *tx, work_order.id, mechanic_id).await?;
        }
        Appointment::link_work_order(&mut *tx, id, work_order.id).await?;

        tx.commit().await?;
        info!(appointment_id = %id, work_order_id = %work_order.id, "Appointment converted into work order");
        Ok(work_order)
    }

    async fn find_pending(pool: &SqlitePool, id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = Appointment::find_by_id(pool, id)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        if !appointment.status.is_pending() {
            return Err(SchedulingError::InvalidState(appointment.status));
        }
        Ok(appointment)
    }

    async fn transition(
        pool: &SqlitePool,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = Self::find_pending(pool, id).await?;
        let updated = Appointment::update_status(pool, id, status)
            .await?
            .ok_or(SchedulingError::NotFound)?;
        info!(appointment_id = %id, from = %appointment.status, to = %status, "Appointment status changed");
        Ok(updated)
    }

    /// Adds the ownership and staffing checks to the field errors of the request.
    async fn validate_booking(
        pool: &SqlitePool,
        mut errors: ValidationErrors,
        customer_id: Uuid,
        motorcycle_id: Uuid,
        mechanic_id: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        let customer_exists = Customer::find_by_id(pool, customer_id).await?.is_some();
        let owned = Motorcycle::find_by_id(pool, motorcycle_id)
            .await?
            .is_some_and(|m| m.customer_id == customer_id);
        let mechanic_ok = match mechanic_id {
            Some(mechanic_id) => Mechanic::find_by_id(pool, mechanic_id)
                .await?
                .is_some_and(|m| m.active),
            None => true,
        };

        errors
            .check("customer_id", customer_exists, "The selected customer is invalid.")
            .check(
                "motorcycle_id",
                owned,
                "The selected motorcycle does not belong to this customer.",
            )
            .check(
                "mechanic_id",
                mechanic_ok,
                "The selected mechanic is invalid or inactive.",
            );
        Ok(errors.into_result()?)
    }

    /// Half-open intervals: an appointment ending at 10:00 does not clash with one starting then.
    async fn ensure_mechanic_free(
        pool: &SqlitePool,
        mechanic_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i32,
        exclude: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        let end = start + Duration::minutes(i64::from(duration_minutes));
        let clash = Appointment::find_booked_for_mechanic(pool, mechanic_id, end)
            .await?
            .into_iter()
            .find(|a| Some(a.id) != exclude && a.overlaps(start, duration_minutes));

        match clash {
            Some(other) => {
                debug!(mechanic_id = %mechanic_id, conflicting = %other.id, "Mechanic is double booked");
                Err(SchedulingError::MechanicUnavailable(other.id))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    struct Fixture {
        pool: SqlitePool,
        customer: Customer,
        motorcycle: Motorcycle,
        mechanic: Mechanic,
    }

    async fn fixture() -> Fixture {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        Fixture {
            pool,
            customer,
            motorcycle,
            mechanic,
        }
    }

    fn booking(f: &Fixture, hour: u32, duration_minutes: i32) -> CreateAppointment {
        CreateAppointment {
            customer_id: f.customer.id,
            motorcycle_id: f.motorcycle.id,
            mechanic_id: Some(f.mechanic.id),
            scheduled_at: test_support::at(10, hour, 0),
            duration_minutes: Some(duration_minutes),
            service_type: "Chain and sprocket".to_string(),
            notes: Some("noisy at speed".to_string()),
        }
    }

    #[tokio::test]
    async fn test_overlap_rejected_adjacent_accepted() {
        let f = fixture().await;
        let first = SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();

        let mut overlapping = booking(&f, 9, 60);
        overlapping.scheduled_at = test_support::at(10, 9, 30);
        let err = SchedulingService::book(&f.pool, &overlapping, 60)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::MechanicUnavailable(id) if id == first.id));

        SchedulingService::book(&f.pool, &booking(&f, 10, 60), 60)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let f = fixture().await;
        let first = SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();
        SchedulingService::cancel(&f.pool, first.id).await.unwrap();

        SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_motorcycle_must_belong_to_customer() {
        let f = fixture().await;
        let stranger = test_support::customer(&f.pool, "other@example.com").await;
        let mut data = booking(&f, 9, 60);
        data.customer_id = stranger.id;

        let err = SchedulingService::book(&f.pool, &data, 60).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(ref v) if v.has("motorcycle_id")));
    }

    #[tokio::test]
    async fn test_duration_bounds() {
        let f = fixture().await;
        let err = SchedulingService::book(&f.pool, &booking(&f, 9, 10), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(ref v) if v.has("duration_minutes")));

        let mut data = booking(&f, 9, 60);
        data.duration_minutes = None;
        let appointment = SchedulingService::book(&f.pool, &data, 45).await.unwrap();
        assert_eq!(appointment.duration_minutes, 45);
    }

    #[tokio::test]
    async fn test_reschedule_ignores_own_slot() {
        let f = fixture().await;
        let appointment = SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();

        let update = UpdateAppointment {
            mechanic_id: Some(f.mechanic.id),
            scheduled_at: test_support::at(10, 9, 30),
            duration_minutes: 90,
            service_type: "Chain and sprocket".to_string(),
            notes: None,
        };
        let moved = SchedulingService::update(&f.pool, appointment.id, &update)
            .await
            .unwrap();
        assert_eq!(moved.scheduled_at, test_support::at(10, 9, 30));
        assert_eq!(moved.duration_minutes, 90);
    }

    #[tokio::test]
    async fn test_convert_to_work_order_once() {
        let f = fixture().await;
        let appointment = SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();
        SchedulingService::confirm(&f.pool, appointment.id).await.unwrap();

        let work_order = SchedulingService::create_work_order(&f.pool, appointment.id)
            .await
            .unwrap();
        assert_eq!(work_order.appointment_id, Some(appointment.id));
        assert_eq!(work_order.description, "Chain and sprocket: noisy at speed");
        let mechanics = Mechanic::find_by_work_order_id(&f.pool, work_order.id)
            .await
            .unwrap();
        assert_eq!(mechanics.len(), 1);

        let linked = SchedulingService::get(&f.pool, appointment.id).await.unwrap();
        assert_eq!(linked.appointment.status, AppointmentStatus::Completed);
        assert_eq!(linked.appointment.work_order_id, Some(work_order.id));

        let err = SchedulingService::create_work_order(&f.pool, appointment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::AlreadyConverted(id) if id == work_order.id));
    }

    #[tokio::test]
    async fn test_cancelled_appointment_cannot_be_converted_or_confirmed() {
        let f = fixture().await;
        let appointment = SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();
        SchedulingService::cancel(&f.pool, appointment.id).await.unwrap();

        assert!(matches!(
            SchedulingService::create_work_order(&f.pool, appointment.id).await,
            Err(SchedulingError::InvalidState(AppointmentStatus::Cancelled))
        ));
        assert!(matches!(
            SchedulingService::confirm(&f.pool, appointment.id).await,
            Err(SchedulingError::InvalidState(AppointmentStatus::Cancelled))
        ));
    }

    #[tokio::test]
    async fn test_calendar_window_is_half_open() {
        let f = fixture().await;
        SchedulingService::book(&f.pool, &booking(&f, 9, 60), 60)
            .await
            .unwrap();
        SchedulingService::book(&f.pool, &booking(&f, 12, 60), 60)
            .await
            .unwrap();

        let window = AppointmentFilter {
            from: Some(test_support::at(10, 9, 0)),
            to: Some(test_support::at(10, 12, 0)),
            ..Default::default()
        };
        let found = SchedulingService::calendar(&f.pool, &window).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ends_at, test_support::at(10, 10, 0));
    }
}
