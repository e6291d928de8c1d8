use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Still on the calendar: can be moved, confirmed or turned into a work order.
    pub fn is_pending(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub motorcycle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub service_type: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub work_order_id: Option<Uuid>, // Set once converted into a work order
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Calendar entry: the appointment plus the labels the schedule view prints.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AppointmentSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub appointment: Appointment,
    pub customer_name: String,
    pub motorcycle_label: String,
    pub mechanic_name: Option<String>,
    pub ends_at: DateTime<Utc>,
}

impl std::ops::Deref for AppointmentSummary {
    type Target = Appointment;
    fn deref(&self) -> &Self::Target {
        &self.appointment
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct CreateAppointment {
    pub customer_id: Uuid,
    pub motorcycle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub service_type: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
pub struct UpdateAppointment {
    pub mechanic_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: i32,
    #[validate(length(min = 1, max = 100))]
    pub service_type: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub mechanic_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

const SUMMARY_SELECT: &str = r#"SELECT a.*,
       c.first_name || ' ' || c.last_name AS customer_name,
       mm.make || ' ' || mm.name || ' (' || mm.year || ')' AS motorcycle_label,
       me.first_name || ' ' || me.last_name AS mechanic_name
  FROM appointments a
  JOIN customers c ON c.id = a.customer_id
  JOIN motorcycles m ON m.id = a.motorcycle_id
  JOIN motorcycle_models mm ON mm.id = m.motorcycle_model_id
  LEFT JOIN mechanics me ON me.id = a.mechanic_id"#;

#[derive(FromRow)]
struct AppointmentSummaryRow {
    #[sqlx(flatten)]
    appointment: Appointment,
    customer_name: String,
    motorcycle_label: String,
    mechanic_name: Option<String>,
}

impl From<AppointmentSummaryRow> for AppointmentSummary {
    fn from(row: AppointmentSummaryRow) -> Self {
        let ends_at = row.appointment.ends_at();
        Self {
            appointment: row.appointment,
            customer_name: row.customer_name,
            motorcycle_label: row.motorcycle_label,
            mechanic_name: row.mechanic_name,
            ends_at,
        }
    }
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether `[scheduled_at, ends_at)` intersects `[start, start + duration_minutes)`.
    /// Back-to-back slots do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, duration_minutes: i32) -> bool {
        let end = start + Duration::minutes(i64::from(duration_minutes));
        self.scheduled_at < end && start < self.ends_at()
    }

    pub async fn find_filtered(
        pool: &SqlitePool,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentSummary>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AppointmentSummaryRow>(&format!(
            r#"{SUMMARY_SELECT}
               WHERE ($1 IS NULL OR a.scheduled_at >= $1)
                 AND ($2 IS NULL OR a.scheduled_at < $2)
                 AND ($3 IS NULL OR a.mechanic_id = $3)
                 AND ($4 IS NULL OR a.customer_id = $4)
                 AND ($5 IS NULL OR a.status = $5)
               ORDER BY a.scheduled_at ASC"#
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.mechanic_id)
        .bind(filter.customer_id)
        .bind(filter.status)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<AppointmentSummary>, sqlx::Error> {
        let row = sqlx::query_as::<_, AppointmentSummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Non-cancelled appointments of a mechanic that start before `until`, for overlap checks.
    /// Appointments that started earlier are included since they may still be running.
    pub async fn find_booked_for_mechanic(
        pool: &SqlitePool,
        mechanic_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(
            r#"SELECT * FROM appointments
               WHERE mechanic_id = $1
                 AND status != 'cancelled'
                 AND scheduled_at < $2
               ORDER BY scheduled_at ASC"#,
        )
        .bind(mechanic_id)
        .bind(until)
        .fetch_all(pool)
        .await
    }

    pub async fn count_upcoming_for_mechanic(
        pool: &SqlitePool,
        mechanic_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM appointments
               WHERE mechanic_id = $1
                 AND status IN ('scheduled', 'confirmed')
                 AND scheduled_at >= $2"#,
        )
        .bind(mechanic_id)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn count_between(
        pool: &SqlitePool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM appointments
               WHERE scheduled_at >= $1 AND scheduled_at < $2 AND status != 'cancelled'"#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateAppointment,
        duration_minutes: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(
            r#"INSERT INTO appointments (id, customer_id, motorcycle_id, mechanic_id, scheduled_at, duration_minutes, service_type, notes, status, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.customer_id)
        .bind(data.motorcycle_id)
        .bind(data.mechanic_id)
        .bind(data.scheduled_at)
        .bind(duration_minutes)
        .bind(&data.service_type)
        .bind(&data.notes)
        .bind(AppointmentStatus::Scheduled)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateAppointment,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(
            r#"UPDATE appointments
               SET mechanic_id = $2, scheduled_at = $3, duration_minutes = $4, service_type = $5, notes = $6, updated_at = $7
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.mechanic_id)
        .bind(data.scheduled_at)
        .bind(data.duration_minutes)
        .bind(&data.service_type)
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn link_work_order<'e, E>(
        executor: E,
        id: Uuid,
        work_order_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Appointment>(
            r#"UPDATE appointments
               SET work_order_id = $2, status = $3, updated_at = $4
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(work_order_id)
        .bind(AppointmentStatus::Completed)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn appointment_at(hour: u32, duration_minutes: i32) -> Appointment {
        let scheduled_at = Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            motorcycle_id: Uuid::new_v4(),
            mechanic_id: None,
            scheduled_at,
            duration_minutes,
            service_type: "Oil change".to_string(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            work_order_id: None,
            created_at: scheduled_at,
            updated_at: scheduled_at,
        }
    }

    #[test]
    fn test_overlap_detection() {
        let existing = appointment_at(10, 60);
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap();

        assert!(existing.overlaps(at(10, 30), 30));
        assert!(existing.overlaps(at(9, 30), 60));
        assert!(existing.overlaps(at(9, 0), 180));
        // Back-to-back is fine on either side
        assert!(!existing.overlaps(at(11, 0), 30));
        assert!(!existing.overlaps(at(9, 0), 60));
    }

    #[test]
    fn test_ends_at() {
        let appointment = appointment_at(8, 90);
        assert_eq!(
            appointment.ends_at(),
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_pending_statuses() {
        assert!(AppointmentStatus::Scheduled.is_pending());
        assert!(AppointmentStatus::Confirmed.is_pending());
        assert!(!AppointmentStatus::Completed.is_pending());
        assert!(!AppointmentStatus::Cancelled.is_pending());
    }
}
