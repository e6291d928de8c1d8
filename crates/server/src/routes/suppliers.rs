use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::supplier::{CreateSupplier, Supplier, SupplierWithPartCount, UpdateSupplier},
    pagination::{Page, PageRequest},
};
use deployment::Deployment;
use services::services::inventory::{InventoryService, SupplierDetails};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_suppliers(
    State(deployment): State<DeploymentImpl>,
    Query(request): Query<PageRequest>,
) -> Result<ResponseJson<ApiResponse<Page<SupplierWithPartCount>>>, ApiError> {
    let page = InventoryService::list_suppliers(&deployment.db().pool, &request).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_supplier(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SupplierDetails>>, ApiError> {
    let details = InventoryService::supplier_details(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn create_supplier(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateSupplier>,
) -> Result<ResponseJson<ApiResponse<Supplier>>, ApiError> {
    let supplier = InventoryService::create_supplier(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        supplier,
        "Supplier created.",
    )))
}

pub async fn update_supplier(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplier>,
) -> Result<ResponseJson<ApiResponse<Supplier>>, ApiError> {
    let supplier = InventoryService::update_supplier(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        supplier,
        "Supplier updated.",
    )))
}

pub async fn delete_supplier(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    InventoryService::delete_supplier(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Supplier deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/{id}",
            get(get_supplier)
                .put(update_supplier)
                .delete(delete_supplier),
        )
}
