use chrono::{DateTime, TimeZone, Utc};
use db::{
    DBService,
    models::{
        customer::{CreateCustomer, Customer},
        mechanic::{CreateMechanic, Mechanic},
        motorcycle::{CreateMotorcycle, Motorcycle},
        motorcycle_model::{CreateMotorcycleModel, MotorcycleModel},
        part::{CreatePart, Part},
        supplier::{CreateSupplier, Supplier},
        work_order::{CreateWorkOrder, WorkOrder},
    },
};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn pool() -> SqlitePool {
    DBService::new_in_memory().await.unwrap().pool
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, day, hour, minute, 0).unwrap()
}

pub async fn customer(pool: &SqlitePool, email: &str) -> Customer {
    let data = CreateCustomer {
        first_name: "Ada".to_string(),
        last_name: email.split('@').next().unwrap_or("Rider").to_string(),
        email: email.to_string(),
        phone: Some("555-0100".to_string()),
        address: None,
        notes: None,
    };
    Customer::create(pool, &data, Uuid::new_v4()).await.unwrap()
}

pub async fn model(pool: &SqlitePool) -> MotorcycleModel {
    let data = CreateMotorcycleModel {
        make: "Ducati".to_string(),
        name: format!("Monster {}", &Uuid::new_v4().to_string()[..4]),
        year: 2021,
        engine_cc: Some(937),
        category: Some("naked".to_string()),
    };
    MotorcycleModel::create(pool, &data, Uuid::new_v4())
        .await
        .unwrap()
}

pub async fn motorcycle(pool: &SqlitePool, customer_id: Uuid) -> Motorcycle {
    let model = model(pool).await;
    let data = CreateMotorcycle {
        customer_id,
        motorcycle_model_id: model.id,
        vin: Uuid::new_v4().simple().to_string()[..17].to_uppercase(),
        license_plate: None,
        color: Some("red".to_string()),
        mileage: Some(12_000),
        notes: None,
    };
    Motorcycle::create(pool, &data, Uuid::new_v4()).await.unwrap()
}

pub async fn mechanic(pool: &SqlitePool, email: &str) -> Mechanic {
    let data = CreateMechanic {
        first_name: "Sam".to_string(),
        last_name: "Wrench".to_string(),
        email: email.to_string(),
        phone: None,
        specialization: Some("engines".to_string()),
        hourly_rate_cents: 6_000,
    };
    Mechanic::create(pool, &data, Uuid::new_v4()).await.unwrap()
}

pub async fn supplier(pool: &SqlitePool) -> Supplier {
    let data = CreateSupplier {
        name: "Brembo".to_string(),
        contact_name: None,
        email: Some("parts@brembo.example".to_string()),
        phone: None,
        address: None,
    };
    Supplier::create(pool, &data, Uuid::new_v4()).await.unwrap()
}

pub async fn part(pool: &SqlitePool, supplier_id: Uuid, unit_price_cents: i64, stock: i64) -> Part {
    let data = CreatePart {
        supplier_id,
        sku: format!("SKU-{}", &Uuid::new_v4().simple().to_string()[..8]),
        name: "Brake pad set".to_string(),
        description: None,
        unit_price_cents,
        stock_quantity: Some(stock),
        reorder_level: Some(2),
    };
    Part::create(pool, &data, Uuid::new_v4()).await.unwrap()
}

pub async fn work_order(pool: &SqlitePool, motorcycle: &Motorcycle) -> WorkOrder {
    let data = CreateWorkOrder {
        motorcycle_id: motorcycle.id,
        description: "Annual service".to_string(),
        diagnosis: None,
        labor_hours: Some(2.0),
        mechanic_ids: None,
    };
    WorkOrder::create(pool, Uuid::new_v4(), motorcycle.customer_id, None, &data)
        .await
        .unwrap()
}
