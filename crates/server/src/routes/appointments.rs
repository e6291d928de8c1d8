use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use db::models::{
    appointment::{
        Appointment, AppointmentFilter, AppointmentStatus, AppointmentSummary, CreateAppointment,
        UpdateAppointment,
    },
    work_order::WorkOrder,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::scheduling::SchedulingService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// Calendar window `[from, to)` plus optional narrowing.
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub mechanic_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl From<CalendarQuery> for AppointmentFilter {
    fn from(query: CalendarQuery) -> Self {
        Self {
            from: query.from,
            to: query.to,
            mechanic_id: query.mechanic_id,
            customer_id: query.customer_id,
            status: query.status,
        }
    }
}

pub async fn list_appointments(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<CalendarQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AppointmentSummary>>>, ApiError> {
    let filter: AppointmentFilter = query.into();
    let appointments = SchedulingService::calendar(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(appointments)))
}

pub async fn get_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AppointmentSummary>>, ApiError> {
    let appointment = SchedulingService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

pub async fn book_appointment(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateAppointment>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let default_minutes = deployment.current_config().await.default_appointment_minutes;
    let appointment =
        SchedulingService::book(&deployment.db().pool, &payload, default_minutes).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        appointment,
        "Appointment booked.",
    )))
}

pub async fn update_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointment>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let appointment = SchedulingService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        appointment,
        "Appointment updated.",
    )))
}

pub async fn confirm_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let appointment = SchedulingService::confirm(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

pub async fn cancel_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let appointment = SchedulingService::cancel(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

pub async fn complete_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let appointment = SchedulingService::complete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

/// POST /api/appointments/{id}/work-order
/// Open a work order from the appointment and mark the appointment completed.
pub async fn create_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = SchedulingService::create_work_order(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        work_order,
        "Work order created from appointment.",
    )))
}

pub async fn delete_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    SchedulingService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Appointment deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments).post(book_appointment),
        )
        .route(
            "/appointments/{id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/appointments/{id}/confirm", post(confirm_appointment))
        .route("/appointments/{id}/cancel", post(cancel_appointment))
        .route("/appointments/{id}/complete", post(complete_appointment))
        .route("/appointments/{id}/work-order", post(create_work_order))
}
