use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::health::{DatabaseHealth, HealthService};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DatabaseHealth>>, ApiError> {
    let health = HealthService::check(&deployment.db().pool).await?;
    let message = health.summary();
    Ok(ResponseJson(ApiResponse::success_with_message(
        health, message,
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
