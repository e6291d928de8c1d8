use axum::Router;
use db::pagination::PageRequest;
use tower_http::trace::TraceLayer;

use crate::DeploymentImpl;

pub mod appointments;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod mechanics;
pub mod motorcycle_models;
pub mod motorcycles;
pub mod parts;
pub mod portal;
pub mod suppliers;
pub mod work_orders;
pub mod work_sessions;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(config::router(&deployment))
        .merge(dashboard::router(&deployment))
        .merge(customers::router(&deployment))
        .merge(mechanics::router(&deployment))
        .merge(motorcycle_models::router(&deployment))
        .merge(motorcycles::router(&deployment))
        .merge(suppliers::router(&deployment))
        .merge(parts::router(&deployment))
        .merge(appointments::router(&deployment))
        .merge(work_orders::router(&deployment))
        .merge(work_sessions::router(&deployment))
        .merge(invoices::router(&deployment))
        .merge(portal::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

/// Build a [`PageRequest`] from the paging fields of a list query.
pub(crate) fn page_request(
    page: Option<i64>,
    per_page: Option<i64>,
    search: Option<String>,
) -> PageRequest {
    PageRequest {
        page,
        per_page,
        search,
    }
}
