//! Motorcycle catalogue models and the customer-owned motorcycles built on them.

use chrono::{Datelike, Utc};
use db::{
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentSummary},
        customer::Customer,
        motorcycle::{CreateMotorcycle, Motorcycle, MotorcycleSummary, UpdateMotorcycle},
        motorcycle_model::{
            CreateMotorcycleModel, MotorcycleModel, MotorcycleModelWithCount,
            UpdateMotorcycleModel,
        },
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
pub enum FleetError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("motorcycle model not found")]
    ModelNotFound,
    #[error("motorcycle not found")]
    MotorcycleNotFound,
    #[error("model is used by {0} motorcycle(s)")]
    ModelInUse(i64),
    #[error("motorcycle has service records")]
    HasServiceRecords,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MotorcycleModelDetails {
    pub model: MotorcycleModel,
    pub motorcycle_count: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MotorcycleDetails {
    pub motorcycle: MotorcycleSummary,
    pub owner: Customer,
    pub model: MotorcycleModel,
    pub work_orders: Vec<WorkOrderSummary>,
    pub appointments: Vec<AppointmentSummary>,
}

pub struct FleetService;

impl FleetService {
    pub async fn list_models(
        pool: &SqlitePool,
        request: &PageRequest,
    ) -> Result<Page<MotorcycleModelWithCount>, FleetError> {
        Ok(MotorcycleModel::find_page(pool, request).await?)
    }

    pub async fn get_model(pool: &SqlitePool, id: Uuid) -> Result<MotorcycleModel, FleetError> {
        MotorcycleModel::find_by_id(pool, id)
            .await?
            .ok_or(FleetError::ModelNotFound)
    }

    pub async fn model_details(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<MotorcycleModelDetails, FleetError> {
        let model = Self::get_model(pool, id).await?;
        let motorcycle_count = MotorcycleModel::count_motorcycles(pool, id).await?;
        Ok(MotorcycleModelDetails {
            model,
            motorcycle_count,
        })
    }

    pub async fn create_model(
        pool: &SqlitePool,
        data: &CreateMotorcycleModel,
    ) -> Result<MotorcycleModel, FleetError> {
        let data = Self::validate_model(pool, data, None).await?;
        let model = MotorcycleModel::create(pool, &data, Uuid::new_v4()).await?;
        info!(model_id = %model.id, model = %model.display_name(), "Motorcycle model created");
        Ok(model)
    }

    pub async fn update_model(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMotorcycleModel,
    ) -> Result<MotorcycleModel, FleetError> {
        Self::get_model(pool, id).await?;
        let data = Self::validate_model(pool, data, Some(id)).await?;
        MotorcycleModel::update(pool, id, &data)
            .await?
            .ok_or(FleetError::ModelNotFound)
    }

    pub async fn delete_model(pool: &SqlitePool, id: Uuid) -> Result<(), FleetError> {
        Self::get_model(pool, id).await?;
        let in_use = MotorcycleModel::count_motorcycles(pool, id).await?;
        if in_use > 0 {
            return Err(FleetError::ModelInUse(in_use));
        }
        MotorcycleModel::delete(pool, id).await?;
        info!(model_id = %id, "Motorcycle model deleted");
        Ok(())
    }

    pub async fn list_motorcycles(
        pool: &SqlitePool,
        request: &PageRequest,
        customer_id: Option<Uuid>,
    ) -> Result<Page<MotorcycleSummary>, FleetError> {
        Ok(Motorcycle::find_page(pool, request, customer_id).await?)
    }

    pub async fn get_motorcycle(pool: &SqlitePool, id: Uuid) -> Result<Motorcycle, FleetError> {
        Motorcycle::find_by_id(pool, id)
            .await?
            .ok_or(FleetError::MotorcycleNotFound)
    }

    pub async fn motorcycle_details(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<MotorcycleDetails, FleetError> {
        let motorcycle = Motorcycle::find_summary_by_id(pool, id)
            .await?
            .ok_or(FleetError::MotorcycleNotFound)?;
        let owner = Customer::find_by_id(pool, motorcycle.customer_id)
            .await?
            .ok_or(FleetError::MotorcycleNotFound)?;
        let model = Self::get_model(pool, motorcycle.motorcycle_model_id).await?;
        let work_orders = WorkOrder::find_by_motorcycle_id(pool, id).await?;
        let appointments = Appointment::find_filtered(
            pool,
            &AppointmentFilter {
                customer_id: Some(motorcycle.customer_id),
                ..Default::default()
            },
        )
        .await?
        .into_iter()
        .filter(|a| a.appointment.motorcycle_id == id)
        .collect();

        Ok(MotorcycleDetails {
            motorcycle,
            owner,
            model,
            work_orders,
            appointments,
        })
    }

    pub async fn create_motorcycle(
        pool: &SqlitePool,
        data: &CreateMotorcycle,
    ) -> Result<Motorcycle, FleetError> {
        let data = Self::validate_motorcycle(pool, data, None).await?;
        let motorcycle = Motorcycle::create(pool, &data, Uuid::new_v4()).await?;
        info!(
            motorcycle_id = %motorcycle.id,
            customer_id = %motorcycle.customer_id,
            vin = %motorcycle.vin,
            "Motorcycle registered"
        );
        Ok(motorcycle)
    }

    pub async fn update_motorcycle(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMotorcycle,
    ) -> Result<Motorcycle, FleetError> {
        Self::get_motorcycle(pool, id).await?;
        let data = Self::validate_motorcycle(pool, data, Some(id)).await?;
        Motorcycle::update(pool, id, &data)
            .await?
            .ok_or(FleetError::MotorcycleNotFound)
    }

    pub async fn delete_motorcycle(pool: &SqlitePool, id: Uuid) -> Result<(), FleetError> {
        Self::get_motorcycle(pool, id).await?;
        if Motorcycle::count_service_records(pool, id).await? > 0 {
            return Err(FleetError::HasServiceRecords);
        }
        Motorcycle::delete(pool, id).await?;
        info!(motorcycle_id = %id, "Motorcycle deleted");
        Ok(())
    }

    async fn validate_model(
        pool: &SqlitePool,
        data: &CreateMotorcycleModel,
        existing_id: Option<Uuid>,
    ) -> Result<CreateMotorcycleModel, FleetError> {
        let data = CreateMotorcycleModel {
            make: clean(&data.make),
            name: clean(&data.name),
            year: data.year,
            engine_cc: data.engine_cc,
            category: clean_optional(data.category.clone()),
        };

        let duplicate =
            match MotorcycleModel::find_by_identity(pool, &data.make, &data.name, data.year)
                .await?
            {
                Some(other) => Some(other.id) != existing_id,
                None => false,
            };
        let latest_year = i64::from(Utc::now().year()) + 1;

        let mut errors = ValidationErrors::of(&data);
        errors
            .check(
                "year",
                i64::from(data.year) <= latest_year,
                format!("The year may not be later than {}.", latest_year),
            )
            .check(
                "name",
                !duplicate,
                "This make, model and year combination already exists.",
            );
        errors.into_result()?;

        Ok(data)
    }

    async fn validate_motorcycle(
        pool: &SqlitePool,
        data: &CreateMotorcycle,
        existing_id: Option<Uuid>,
    ) -> Result<CreateMotorcycle, FleetError> {
        let data = CreateMotorcycle {
            customer_id: data.customer_id,
            motorcycle_model_id: data.motorcycle_model_id,
            vin: clean(&data.vin).to_uppercase(),
            license_plate: clean_optional(data.license_plate.clone()).map(|p| p.to_uppercase()),
            color: clean_optional(data.color.clone()),
            mileage: data.mileage,
            notes: clean_optional(data.notes.clone()),
        };

        let owner_exists = Customer::find_by_id(pool, data.customer_id).await?.is_some();
        let model_exists = MotorcycleModel::find_by_id(pool, data.motorcycle_model_id)
            .await?
            .is_some();
        let vin_taken = match Motorcycle::find_by_vin(pool, &data.vin).await? {
            Some(other) => Some(other.id) != existing_id,
            None => false,
        };

        let mut errors = ValidationErrors::of(&data);
        errors
            .check("customer_id", owner_exists, "The selected customer is invalid.")
            .check(
                "motorcycle_model_id",
                model_exists,
                "The selected motorcycle model is invalid.",
            )
            .check("vin", !vin_taken, "The vin has already been taken.");
        errors.into_result()?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    fn new_model(year: i32) -> CreateMotorcycleModel {
        CreateMotorcycleModel {
            make: "Honda".to_string(),
            name: "CB500F".to_string(),
            year,
            engine_cc: Some(471),
            category: None,
        }
    }

    #[tokio::test]
    async fn test_model_identity_is_unique() {
        let pool = test_support::pool().await;
        FleetService::create_model(&pool, &new_model(2022)).await.unwrap();
        FleetService::create_model(&pool, &new_model(2023)).await.unwrap();

        let err = FleetService::create_model(&pool, &new_model(2022))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Validation(ref v) if v.has("name")));
    }

    #[tokio::test]
    async fn test_model_year_range() {
        let pool = test_support::pool().await;
        let err = FleetService::create_model(&pool, &new_model(1800))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Validation(ref v) if v.has("year")));

        let next_year = Utc::now().year() + 1;
        FleetService::create_model(&pool, &new_model(next_year)).await.unwrap();
        let err = FleetService::create_model(&pool, &new_model(next_year + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Validation(ref v) if v.has("year")));
    }

    #[tokio::test]
    async fn test_model_in_use_cannot_be_deleted() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;

        let err = FleetService::delete_model(&pool, motorcycle.motorcycle_model_id)
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::ModelInUse(1)));
    }

    #[tokio::test]
    async fn test_motorcycle_checks_owner_and_vin() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let existing = test_support::motorcycle(&pool, customer.id).await;

        let data = CreateMotorcycle {
            customer_id: Uuid::new_v4(),
            motorcycle_model_id: existing.motorcycle_model_id,
            vin: existing.vin.to_lowercase(),
            license_plate: None,
            color: None,
            mileage: Some(-5),
            notes: None,
        };
        let err = FleetService::create_motorcycle(&pool, &data)
            .await
            .unwrap_err();
        let FleetError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.field_names(), vec!["customer_id", "mileage", "vin"]);
    }

    #[tokio::test]
    async fn test_motorcycle_with_history_cannot_be_deleted() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        test_support::work_order(&pool, &motorcycle).await;

        let err = FleetService::delete_motorcycle(&pool, motorcycle.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::HasServiceRecords));
    }

    #[tokio::test]
    async fn test_motorcycle_details_include_history() {
        let pool = test_support::pool().await;
        let customer = test_support::customer(&pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(&pool, customer.id).await;
        test_support::work_order(&pool, &motorcycle).await;

        let details = FleetService::motorcycle_details(&pool, motorcycle.id)
            .await
            .unwrap();
        assert_eq!(details.owner.id, customer.id);
        assert_eq!(details.work_orders.len(), 1);
        assert_eq!(details.motorcycle.make, "Ducati");
    }
}
