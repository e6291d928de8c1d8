use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::{
        work_session::{CreateWorkSession, UpdateWorkSession, WorkSession, WorkSessionSummary},
        work_status::WorkStatus,
    },
    pagination::Page,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::work_sessions::WorkSessionService;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::page_request;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct WorkSessionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<WorkStatus>,
}

pub async fn list_work_sessions(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<WorkSessionQuery>,
) -> Result<ResponseJson<ApiResponse<Page<WorkSessionSummary>>>, ApiError> {
    let request = page_request(query.page, query.per_page, query.search);
    let page = WorkSessionService::list(&deployment.db().pool, &request, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkSessionSummary>>, ApiError> {
    let session = WorkSessionService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn create_work_session(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateWorkSession>,
) -> Result<ResponseJson<ApiResponse<WorkSession>>, ApiError> {
    let session = WorkSessionService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        session,
        "Work session created.",
    )))
}

pub async fn update_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWorkSession>,
) -> Result<ResponseJson<ApiResponse<WorkSession>>, ApiError> {
    let session = WorkSessionService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        session,
        "Work session updated.",
    )))
}

pub async fn start_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkSession>>, ApiError> {
    let session = WorkSessionService::start(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn complete_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkSession>>, ApiError> {
    let session = WorkSessionService::complete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn delete_work_session(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    WorkSessionService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Work session deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/work-sessions",
            get(list_work_sessions).post(create_work_session),
        )
        .route(
            "/work-sessions/{id}",
            get(get_work_session)
                .put(update_work_session)
                .delete(delete_work_session),
        )
        .route("/work-sessions/{id}/start", post(start_work_session))
        .route("/work-sessions/{id}/complete", post(complete_work_session))
}
