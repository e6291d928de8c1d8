use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::motorcycle::{CreateMotorcycle, Motorcycle, MotorcycleSummary, UpdateMotorcycle},
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::fleet::{FleetService, MotorcycleDetails};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct MotorcycleQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub customer_id: Option<Uuid>,
}

/// GET /api/motorcycles?search=&customer_id=
/// Search matches VIN and licence plate.
pub async fn list_motorcycles(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<MotorcycleQuery>,
) -> Result<ResponseJson<ApiResponse<Page<MotorcycleSummary>>>, ApiError> {
    let request = page_request(query.page, query.per_page, query.search);
    let page =
        FleetService::list_motorcycles(&deployment.db().pool, &request, query.customer_id).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_motorcycle(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<MotorcycleDetails>>, ApiError> {
    let details = FleetService::motorcycle_details(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn create_motorcycle(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateMotorcycle>,
) -> Result<ResponseJson<ApiResponse<Motorcycle>>, ApiError> {
    let motorcycle = FleetService::create_motorcycle(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        motorcycle,
        "Motorcycle created.",
    )))
}

pub async fn update_motorcycle(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMotorcycle>,
) -> Result<ResponseJson<ApiResponse<Motorcycle>>, ApiError> {
    let motorcycle = FleetService::update_motorcycle(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        motorcycle,
        "Motorcycle updated.",
    )))
}

pub async fn delete_motorcycle(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    FleetService::delete_motorcycle(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Motorcycle deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/motorcycles", get(list_motorcycles).post(create_motorcycle))
        .route(
            "/motorcycles/{id}",
            get(get_motorcycle)
                .put(update_motorcycle)
                .delete(delete_motorcycle),
        )
}
