use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::motorcycle_model::{
        CreateMotorcycleModel, MotorcycleModel, MotorcycleModelWithCount, UpdateMotorcycleModel,
    },
    pagination::{Page, PageRequest},
};
use deployment::Deployment;
use services::services::fleet::{FleetService, MotorcycleModelDetails};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub async fn list_models(
    State(deployment): State<DeploymentImpl>,
    Query(request): Query<PageRequest>,
) -> Result<ResponseJson<ApiResponse<Page<MotorcycleModelWithCount>>>, ApiError> {
    let page = FleetService::list_models(&deployment.db().pool, &request).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_model(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<MotorcycleModelDetails>>, ApiError> {
    let details = FleetService::model_details(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn create_model(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateMotorcycleModel>,
) -> Result<ResponseJson<ApiResponse<MotorcycleModel>>, ApiError> {
    let model = FleetService::create_model(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        model,
        "Motorcycle model created.",
    )))
}

pub async fn update_model(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMotorcycleModel>,
) -> Result<ResponseJson<ApiResponse<MotorcycleModel>>, ApiError> {
    let model = FleetService::update_model(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        model,
        "Motorcycle model updated.",
    )))
}

pub async fn delete_model(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    FleetService::delete_model(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Motorcycle model deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/motorcycle-models", get(list_models).post(create_model))
        .route(
            "/motorcycle-models/{id}",
            get(get_model).put(update_model).delete(delete_model),
        )
}
