use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::{
    models::{
        mechanic::Mechanic,
        work_order::{
            AddWorkOrderPart, CreateWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderFilter,
            WorkOrderPart, WorkOrderSummary,
        },
        work_status::WorkStatus,
    },
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::work_orders::{WorkOrderDetails, WorkOrderService};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct WorkOrderQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<WorkStatus>,
    pub customer_id: Option<Uuid>,
    pub mechanic_id: Option<Uuid>,
}

pub async fn list_work_orders(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<WorkOrderQuery>,
) -> Result<ResponseJson<ApiResponse<Page<WorkOrderSummary>>>, ApiError> {
    let filter = WorkOrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        mechanic_id: query.mechanic_id,
    };
    let request = page_request(query.page, query.per_page, query.search);
    let page = WorkOrderService::list(&deployment.db().pool, &request, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkOrderDetails>>, ApiError> {
    let details = WorkOrderService::details(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn create_work_order(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateWorkOrder>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = WorkOrderService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        work_order,
        "Work order created.",
    )))
}

pub async fn update_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWorkOrder>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = WorkOrderService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        work_order,
        "Work order updated.",
    )))
}

pub async fn start_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = WorkOrderService::start(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(work_order)))
}

pub async fn complete_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = WorkOrderService::complete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(work_order)))
}

pub async fn reopen_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkOrder>>, ApiError> {
    let work_order = WorkOrderService::reopen(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(work_order)))
}

/// POST /api/work-orders/{id}/mechanics/{mechanic_id}
/// Returns the mechanics now assigned.
pub async fn assign_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path((id, mechanic_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Vec<Mechanic>>>, ApiError> {
    let mechanics =
        WorkOrderService::assign_mechanic(&deployment.db().pool, id, mechanic_id).await?;
    Ok(ResponseJson(ApiResponse::success(mechanics)))
}

pub async fn unassign_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path((id, mechanic_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Vec<Mechanic>>>, ApiError> {
    let mechanics =
        WorkOrderService::unassign_mechanic(&deployment.db().pool, id, mechanic_id).await?;
    Ok(ResponseJson(ApiResponse::success(mechanics)))
}

/// POST /api/work-orders/{id}/parts
/// Takes the quantity out of stock in the same transaction.
pub async fn add_part(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddWorkOrderPart>,
) -> Result<ResponseJson<ApiResponse<WorkOrderPart>>, ApiError> {
    let line = WorkOrderService::add_part(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(line)))
}

pub async fn remove_part(
    State(deployment): State<DeploymentImpl>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    WorkOrderService::remove_part(&deployment.db().pool, id, line_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_work_order(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    WorkOrderService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Work order deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/work-orders",
            get(list_work_orders).post(create_work_order),
        )
        .route(
            "/work-orders/{id}",
            get(get_work_order)
                .put(update_work_order)
                .delete(delete_work_order),
        )
        .route("/work-orders/{id}/start", post(start_work_order))
        .route("/work-orders/{id}/complete", post(complete_work_order))
        .route("/work-orders/{id}/reopen", post(reopen_work_order))
        .route(
            "/work-orders/{id}/mechanics/{mechanic_id}",
            post(assign_mechanic).delete(unassign_mechanic),
        )
        .route("/work-orders/{id}/parts", post(add_part))
        .route("/work-orders/{id}/parts/{line_id}", delete(remove_part))
}
