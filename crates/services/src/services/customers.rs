use db::{
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentSummary},
        customer::{CreateCustomer, Customer, UpdateCustomer},
        invoice::Invoice,
        motorcycle::{Motorcycle, MotorcycleSummary},
        work_order::{WorkOrder, WorkOrderSummary},
    },
    pagination::{Page, PageRequest},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationErrors, clean, clean_optional};

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("customer not found")]
    NotFound,
    #[error("customer still has {0} motorcycle(s) on file")]
    HasMotorcycles(i64),
}

/// Everything the customer detail page shows.
#[derive(Debug, Clone, Serialize, TS)]
pub struct CustomerProfile {
    pub customer: Customer,
    pub motorcycles: Vec<MotorcycleSummary>,
    pub appointments: Vec<AppointmentSummary>,
    pub work_orders: Vec<WorkOrderSummary>,
    pub invoices: Vec<Invoice>,
}

pub struct CustomerService;

impl CustomerService {
    pub async fn list(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<Customer>, CustomerError> {
        Ok(Customer::find_page(pool, request).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Customer, CustomerError> {
        Customer::find_by_id(pool, id)
            .await?
            .ok_or(CustomerError::NotFound)
    }

    pub async fn profile(pool: &SqlitePool, id: Uuid) -> Result<CustomerProfile, CustomerError> {
        let customer = Self::get(pool, id).await?;
        let motorcycles = Motorcycle::find_by_customer_id(pool, id).await?;
        let appointments = Appointment::find_filtered(
            pool,
            &AppointmentFilter {
                customer_id: Some(id),
                ..Default::default()
            },
        )
        .await?;
        let work_orders = WorkOrder::find_by_customer_id(pool, id).await?;
        let invoices = Invoice::find_by_customer_id(pool, id).await?;

        Ok(CustomerProfile {
            customer,
            motorcycles,
            appointments,
            work_orders,
            invoices,
        })
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateCustomer,
    ) -> Result<Customer, CustomerError> {
        let data = Self::validate(pool, data, None).await?;
        let customer = Customer::create(pool, &data, Uuid::new_v4()).await?;
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateCustomer,
    ) -> Result<Customer, CustomerError> {
        Self::get(pool, id).await?;
        let data = Self::validate(pool, data, Some(id)).await?;
        let customer = Customer::update(pool, id, &data)
            .await?
            .ok_or(CustomerError::NotFound)?;
        info!(customer_id = %id, "Customer updated");
        Ok(customer)
    }

    /// Refused while the customer owns motorcycles: every other record hangs off one.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), CustomerError> {
        Self::get(pool, id).await?;
        let motorcycles = Motorcycle::count_by_customer_id(pool, id).await?;
        if motorcycles > 0 {
            return Err(CustomerError::HasMotorcycles(motorcycles));
        }
        Customer::delete(pool, id).await?;
        info!(customer_id = %id, "Customer deleted");
        Ok(())
    }

    async fn validate(
        pool: &SqlitePool,
        data: &CreateCustomer,
        existing_id: Option<Uuid>,
    ) -> Result<CreateCustomer, CustomerError> {
        let data = CreateCustomer {
            first_name: clean(&data.first_name),
            last_name: clean(&data.last_name),
            email: clean(&data.email).to_lowercase(),
            phone: clean_optional(data.phone.clone()),
            address: clean_optional(data.address.clone()),
            notes: clean_optional(data.notes.clone()),
        };

        let email_taken = match Customer::find_by_email(pool, &data.email).await? {
            Some(other) => Some(other.id) != existing_id,
            None => false,
        };

        let mut errors = ValidationErrors::of(&data);
        errors.check("email", !email_taken, "The email has already been taken.");
        errors.into_result()?;

        Ok(data)
    }
}
