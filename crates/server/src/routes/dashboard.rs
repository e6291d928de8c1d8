use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::{
    billing::{BillingService, FinancialSummary},
    dashboard::{DashboardService, DashboardStats},
};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_dashboard(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = DashboardService::stats(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn get_financial_summary(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<FinancialSummary>>, ApiError> {
    let summary = BillingService::summary(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/financial/summary", get(get_financial_summary))
}
