use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use services::services::config::Config;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_config(State(deployment): State<DeploymentImpl>) -> ResponseJson<ApiResponse<Config>> {
    ResponseJson(ApiResponse::success(deployment.current_config().await))
}

/// Replace the shop settings. The file is written before the live copy changes.
pub async fn update_config(
    State(deployment): State<DeploymentImpl>,
    Json(new_config): Json<Config>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    let config = deployment.update_config(new_config).await?;
    Ok(ResponseJson(ApiResponse::success(config)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/config", get(get_config).put(update_config))
}
