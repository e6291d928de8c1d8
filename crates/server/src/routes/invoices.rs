use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::invoice::{Invoice, InvoiceFilter, InvoiceStatus, InvoiceSummary},
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::billing::{BillingService, GenerateInvoice, InvoiceDetails};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
}

pub async fn list_invoices(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<InvoiceQuery>,
) -> Result<ResponseJson<ApiResponse<Page<InvoiceSummary>>>, ApiError> {
    let filter = InvoiceFilter {
        status: query.status,
        customer_id: query.customer_id,
    };
    let request = page_request(query.page, query.per_page, query.search);
    let page = BillingService::list(&deployment.db().pool, &request, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InvoiceDetails>>, ApiError> {
    let details = BillingService::details(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

/// POST /api/invoices/from-work-order/{id}
/// Parts on the order plus labor hours at the submitted (or configured) rate.
/// The body is optional; without one the configured rate applies.
pub async fn generate_from_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    payload: Option<Json<GenerateInvoice>>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let config = deployment.current_config().await;
    let invoice =
        BillingService::generate_from_work_order(&deployment.db().pool, id, &payload, &config)
            .await?;
    let message = format!("Invoice {} generated.", invoice.invoice_number);
    Ok(ResponseJson(ApiResponse::success_with_message(
        invoice, message,
    )))
}

pub async fn generate_from_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    payload: Option<Json<GenerateInvoice>>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let config = deployment.current_config().await;
    let invoice =
        BillingService::generate_from_work_session(&deployment.db().pool, id, &payload, &config)
            .await?;
    let message = format!("Invoice {} generated.", invoice.invoice_number);
    Ok(ResponseJson(ApiResponse::success_with_message(
        invoice, message,
    )))
}

pub async fn mark_paid(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let invoice = BillingService::mark_paid(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn delete_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    BillingService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Invoice deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route(
            "/invoices/{id}",
            get(get_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/mark-paid", post(mark_paid))
        .route(
            "/invoices/from-work-order/{id}",
            post(generate_from_work_order),
        )
        .route(
            "/invoices/from-work-session/{id}",
            post(generate_from_work_session),
        )
}
