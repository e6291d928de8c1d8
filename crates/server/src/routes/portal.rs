//! Customer self-service routes. The customer is named in the path; anything that
//! belongs to someone else answers 404.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    appointment::{Appointment, AppointmentSummary},
    customer::Customer,
    invoice::Invoice,
    motorcycle::MotorcycleSummary,
    work_order::WorkOrderSummary,
};
use deployment::Deployment;
use services::services::{
    billing::InvoiceDetails,
    portal::{PortalBooking, PortalService},
    work_orders::WorkOrderDetails,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_customer(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Customer>>, ApiError> {
    let customer = PortalService::customer(&deployment.db().pool, customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(customer)))
}

pub async fn my_motorcycles(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<MotorcycleSummary>>>, ApiError> {
    let motorcycles = PortalService::motorcycles(&deployment.db().pool, customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(motorcycles)))
}

pub async fn my_appointments(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<AppointmentSummary>>>, ApiError> {
    let appointments = PortalService::appointments(&deployment.db().pool, customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(appointments)))
}

pub async fn book_appointment(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<PortalBooking>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let default_minutes = deployment.current_config().await.default_appointment_minutes;
    let appointment =
        PortalService::book(&deployment.db().pool, customer_id, &payload, default_minutes)
            .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        appointment,
        "Appointment requested.",
    )))
}

pub async fn cancel_appointment(
    State(deployment): State<DeploymentImpl>,
    Path((customer_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Appointment>>, ApiError> {
    let appointment =
        PortalService::cancel(&deployment.db().pool, customer_id, appointment_id).await?;
    Ok(ResponseJson(ApiResponse::success(appointment)))
}

pub async fn my_work_orders(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<WorkOrderSummary>>>, ApiError> {
    let work_orders = PortalService::work_orders(&deployment.db().pool, customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(work_orders)))
}

pub async fn my_work_order(
    State(deployment): State<DeploymentImpl>,
    Path((customer_id, work_order_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<WorkOrderDetails>>, ApiError> {
    let details =
        PortalService::work_order(&deployment.db().pool, customer_id, work_order_id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn my_invoices(
    State(deployment): State<DeploymentImpl>,
    Path(customer_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Invoice>>>, ApiError> {
    let invoices = PortalService::invoices(&deployment.db().pool, customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(invoices)))
}

pub async fn my_invoice(
    State(deployment): State<DeploymentImpl>,
    Path((customer_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<InvoiceDetails>>, ApiError> {
    let details = PortalService::invoice(&deployment.db().pool, customer_id, invoice_id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/portal/customers/{customer_id}",
        Router::new()
            .route("/profile", get(get_customer))
            .route("/motorcycles", get(my_motorcycles))
            .route(
                "/appointments",
                get(my_appointments).post(book_appointment),
            )
            .route(
                "/appointments/{appointment_id}/cancel",
                post(cancel_appointment),
            )
            .route("/work-orders", get(my_work_orders))
            .route("/work-orders/{work_order_id}", get(my_work_order))
            .route("/invoices", get(my_invoices))
            .route("/invoices/{invoice_id}", get(my_invoice)),
    )
}
