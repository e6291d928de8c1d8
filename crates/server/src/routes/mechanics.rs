use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::mechanic::{CreateMechanic, Mechanic, UpdateMechanic},
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::staff::{MechanicOverview, MechanicService};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct MechanicQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

pub async fn list_mechanics(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<MechanicQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Mechanic>>>, ApiError> {
    let request = page_request(query.page, query.per_page, query.search);
    let page = MechanicService::list(&deployment.db().pool, &request, query.active_only).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// GET /api/mechanics/{id}
/// The mechanic with open work orders and upcoming appointments.
pub async fn get_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<MechanicOverview>>, ApiError> {
    let overview = MechanicService::overview(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub async fn create_mechanic(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateMechanic>,
) -> Result<ResponseJson<ApiResponse<Mechanic>>, ApiError> {
    let mechanic = MechanicService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        mechanic,
        "Mechanic created.",
    )))
}

pub async fn update_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMechanic>,
) -> Result<ResponseJson<ApiResponse<Mechanic>>, ApiError> {
    let mechanic = MechanicService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        mechanic,
        "Mechanic updated.",
    )))
}

pub async fn activate_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Mechanic>>, ApiError> {
    let mechanic = MechanicService::set_active(&deployment.db().pool, id, true).await?;
    Ok(ResponseJson(ApiResponse::success(mechanic)))
}

pub async fn deactivate_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Mechanic>>, ApiError> {
    let mechanic = MechanicService::set_active(&deployment.db().pool, id, false).await?;
    Ok(ResponseJson(ApiResponse::success(mechanic)))
}

pub async fn delete_mechanic(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    MechanicService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Mechanic deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/mechanics", get(list_mechanics).post(create_mechanic))
        .route(
            "/mechanics/{id}",
            get(get_mechanic)
                .put(update_mechanic)
                .delete(delete_mechanic),
        )
        .route("/mechanics/{id}/activate", post(activate_mechanic))
        .route("/mechanics/{id}/deactivate", post(deactivate_mechanic))
}
