use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::part::{CreatePart, Part, PartFilter, PartWithSupplier, UpdatePart},
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::inventory::{InventoryService, StockAdjustment};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PartQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub low_stock_only: bool,
}

/// GET /api/parts?search=&supplier_id=&low_stock_only=
pub async fn list_parts(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<PartQuery>,
) -> Result<ResponseJson<ApiResponse<Page<PartWithSupplier>>>, ApiError> {
    let filter = PartFilter {
        supplier_id: query.supplier_id,
        low_stock_only: query.low_stock_only,
    };
    let request = page_request(query.page, query.per_page, query.search);
    let page = InventoryService::list_parts(&deployment.db().pool, &request, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn low_stock_report(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<PartWithSupplier>>>, ApiError> {
    let parts = InventoryService::low_stock(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(parts)))
}

pub async fn get_part(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PartWithSupplier>>, ApiError> {
    let part = InventoryService::get_part(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(part)))
}

pub async fn create_part(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreatePart>,
) -> Result<ResponseJson<ApiResponse<Part>>, ApiError> {
    let default_reorder_level = deployment.current_config().await.low_stock_threshold;
    let part =
        InventoryService::create_part(&deployment.db().pool, &payload, default_reorder_level)
            .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        part,
        "Part created.",
    )))
}

pub async fn update_part(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePart>,
) -> Result<ResponseJson<ApiResponse<Part>>, ApiError> {
    let part = InventoryService::update_part(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        part,
        "Part updated.",
    )))
}

/// POST /api/parts/{id}/adjust-stock
/// Apply a signed delta; stock never goes below zero.
pub async fn adjust_stock(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustment>,
) -> Result<ResponseJson<ApiResponse<Part>>, ApiError> {
    let part = InventoryService::adjust_stock(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(part)))
}

pub async fn delete_part(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    InventoryService::delete_part(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Part deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/parts", get(list_parts).post(create_part))
        .route("/parts/low-stock", get(low_stock_report))
        .route(
            "/parts/{id}",
            get(get_part).put(update_part).delete(delete_part),
        )
        .route("/parts/{id}/adjust-stock", post(adjust_stock))
}
