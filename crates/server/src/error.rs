use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use deployment::DeploymentError;
use services::services::{
    billing::BillingError, config::ConfigError, customers::CustomerError, fleet::FleetError,
    health::HealthError, inventory::InventoryError, portal::PortalError,
    scheduling::SchedulingError, staff::StaffError, validation::ValidationErrors,
    work_orders::WorkOrderError, work_sessions::WorkSessionError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Customer(#[from] CustomerError),
    #[error(transparent)]
    Staff(#[from] StaffError),
    #[error(transparent)]
    Fleet(#[from] FleetError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error(transparent)]
    WorkOrder(#[from] WorkOrderError),
    #[error(transparent)]
    WorkSession(#[from] WorkSessionError),
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error(transparent)]
    Health(#[from] HealthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// How a failure is reported to the client.
enum Failure<'a> {
    Invalid(&'a ValidationErrors),
    NotFound,
    Conflict,
    Internal,
}

fn database_failure(err: &sqlx::Error) -> Failure<'_> {
    match err {
        sqlx::Error::RowNotFound => Failure::NotFound,
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            Failure::Conflict
        }
        _ => Failure::Internal,
    }
}

fn scheduling_failure(err: &SchedulingError) -> Failure<'_> {
    match err {
        SchedulingError::Database(e) => database_failure(e),
        SchedulingError::Validation(v) => Failure::Invalid(v),
        SchedulingError::NotFound => Failure::NotFound,
        SchedulingError::MechanicUnavailable(_)
        | SchedulingError::InvalidState(_)
        | SchedulingError::AlreadyConverted(_) => Failure::Conflict,
    }
}

fn work_order_failure(err: &WorkOrderError) -> Failure<'_> {
    match err {
        WorkOrderError::Database(e) => database_failure(e),
        WorkOrderError::Validation(v) => Failure::Invalid(v),
        WorkOrderError::NotFound
        | WorkOrderError::PartNotFound
        | WorkOrderError::LineNotFound
        | WorkOrderError::MechanicNotAssigned => Failure::NotFound,
        WorkOrderError::AlreadyInvoiced
        | WorkOrderError::InvalidState(_)
        | WorkOrderError::InsufficientStock { .. } => Failure::Conflict,
    }
}

fn billing_failure(err: &BillingError) -> Failure<'_> {
    match err {
        BillingError::Database(e) => database_failure(e),
        BillingError::Validation(v) => Failure::Invalid(v),
        BillingError::NotFound
        | BillingError::WorkOrderNotFound
        | BillingError::WorkSessionNotFound => Failure::NotFound,
        BillingError::NotCompleted(_)
        | BillingError::AlreadyInvoiced(_)
        | BillingError::AlreadyPaid
        | BillingError::PaidInvoiceLocked => Failure::Conflict,
    }
}

impl ApiError {
    fn failure(&self) -> Failure<'_> {
        match self {
            ApiError::Customer(err) => match err {
                CustomerError::Database(e) => database_failure(e),
                CustomerError::Validation(v) => Failure::Invalid(v),
                CustomerError::NotFound => Failure::NotFound,
                CustomerError::HasMotorcycles(_) => Failure::Conflict,
            },
            ApiError::Staff(err) => match err {
                StaffError::Database(e) => database_failure(e),
                StaffError::Validation(v) => Failure::Invalid(v),
                StaffError::NotFound => Failure::NotFound,
                StaffError::ActiveAssignments | StaffError::HasHistory => Failure::Conflict,
            },
            ApiError::Fleet(err) => match err {
                FleetError::Database(e) => database_failure(e),
                FleetError::Validation(v) => Failure::Invalid(v),
                FleetError::ModelNotFound | FleetError::MotorcycleNotFound => Failure::NotFound,
                FleetError::ModelInUse(_) | FleetError::HasServiceRecords => Failure::Conflict,
            },
            ApiError::Inventory(err) => match err {
                InventoryError::Database(e) => database_failure(e),
                InventoryError::Validation(v) => Failure::Invalid(v),
                InventoryError::SupplierNotFound | InventoryError::PartNotFound => {
                    Failure::NotFound
                }
                InventoryError::SupplierHasParts(_)
                | InventoryError::PartInUse(_)
                | InventoryError::InsufficientStock { .. } => Failure::Conflict,
            },
            ApiError::Scheduling(err) => scheduling_failure(err),
            ApiError::WorkOrder(err) => work_order_failure(err),
            ApiError::WorkSession(err) => match err {
                WorkSessionError::Database(e) => database_failure(e),
                WorkSessionError::Validation(v) => Failure::Invalid(v),
                WorkSessionError::NotFound => Failure::NotFound,
                WorkSessionError::AlreadyInvoiced | WorkSessionError::InvalidState(_) => {
                    Failure::Conflict
                }
            },
            ApiError::Billing(err) => billing_failure(err),
            ApiError::Portal(err) => match err {
                PortalError::Database(e) => database_failure(e),
                PortalError::CustomerNotFound | PortalError::NotFound => Failure::NotFound,
                PortalError::NotUpcoming => Failure::Conflict,
                PortalError::Scheduling(e) => scheduling_failure(e),
                PortalError::WorkOrder(e) => work_order_failure(e),
                PortalError::Billing(e) => billing_failure(e),
            },
            ApiError::Config(ConfigError::Validation(v))
            | ApiError::Deployment(DeploymentError::Config(ConfigError::Validation(v))) => {
                Failure::Invalid(v)
            }
            ApiError::Database(e) => database_failure(e),
            ApiError::Health(_) | ApiError::Config(_) | ApiError::Deployment(_) => {
                Failure::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.failure() {
            Failure::Invalid(errors) => {
                let body = ApiResponse::<(), BTreeMap<String, Vec<String>>>::error_with_data(
                    errors.fields.clone(),
                    "The given data was invalid.",
                );
                (StatusCode::UNPROCESSABLE_ENTITY, ResponseJson(body)).into_response()
            }
            Failure::NotFound => {
                let body = ApiResponse::<()>::error(&self.to_string());
                (StatusCode::NOT_FOUND, ResponseJson(body)).into_response()
            }
            Failure::Conflict => {
                let body = ApiResponse::<()>::error(&self.to_string());
                (StatusCode::CONFLICT, ResponseJson(body)).into_response()
            }
            Failure::Internal => {
                tracing::error!(error = %self, "Request failed");
                let body = ApiResponse::<()>::error("Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, ResponseJson(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(CustomerError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CustomerError::HasMotorcycles(2)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CustomerError::Validation(ValidationErrors::single(
                "email",
                "The email field is required."
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PortalError::Billing(BillingError::AlreadyPaid)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(sqlx::Error::PoolTimedOut),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
