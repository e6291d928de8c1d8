use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::customer::{CreateCustomer, Customer, UpdateCustomer},
    pagination::{Page, PageRequest},
};
use deployment::Deployment;
use services::services::customers::{CustomerProfile, CustomerService};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// GET /api/customers?page=&per_page=&search=
pub async fn list_customers(
    State(deployment): State<DeploymentImpl>,
    Query(request): Query<PageRequest>,
) -> Result<ResponseJson<ApiResponse<Page<Customer>>>, ApiError> {
    let page = CustomerService::list(&deployment.db().pool, &request).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// GET /api/customers/{id}
/// The customer with their motorcycles, appointments, work orders and invoices.
pub async fn get_customer(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CustomerProfile>>, ApiError> {
    let profile = CustomerService::profile(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub async fn create_customer(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateCustomer>,
) -> Result<ResponseJson<ApiResponse<Customer>>, ApiError> {
    let customer = CustomerService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        customer,
        "Customer created.",
    )))
}

pub async fn update_customer(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomer>,
) -> Result<ResponseJson<ApiResponse<Customer>>, ApiError> {
    let customer = CustomerService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        customer,
        "Customer updated.",
    )))
}

pub async fn delete_customer(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    CustomerService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Customer deleted.",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/{id}",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
}
