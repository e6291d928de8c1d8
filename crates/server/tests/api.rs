use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use db::DBService;
use http_body_util::BodyExt;
use local_deployment::LocalDeployment;
use serde_json::{Value, json};
use services::services::config::Config;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = DBService::new_in_memory().await.unwrap();
        let deployment =
            LocalDeployment::from_parts(db, Config::default(), dir.path().join("config.json"));
        Self {
            router: server::routes::router(deployment),
            _dir: dir,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, None).await
    }

    /// POST that must succeed; returns `data`.
    async fn create(&self, uri: &str, body: Value) -> Value {
        let (status, json) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::OK, "POST {uri} failed: {json}");
        json["data"].clone()
    }

    async fn customer(&self, email: &str) -> Value {
        self.create(
            "/api/customers",
            json!({"first_name": "Ada", "last_name": "Lovelace", "email": email}),
        )
        .await
    }

    async fn motorcycle(&self, customer_id: &Value, vin: &str) -> Value {
        let model = self
            .create(
                "/api/motorcycle-models",
                json!({"make": "Honda", "name": format!("CBR {vin}"), "year": 2021}),
            )
            .await;
        self.create(
            "/api/motorcycles",
            json!({
                "customer_id": customer_id,
                "motorcycle_model_id": model["id"],
                "vin": vin,
                "mileage": 8000
            }),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_reports_migrated_database() {
    let app = TestApp::new().await;
    let (status, json) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["missing_tables"], json!([]));
}

#[tokio::test]
async fn test_customer_roundtrip_and_validation() {
    let app = TestApp::new().await;
    let customer = app.customer("Ada@Example.com").await;
    assert_eq!(customer["email"], "ada@example.com");

    let (status, json) = app
        .get(&format!("/api/customers/{}", customer["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["customer"]["first_name"], "Ada");
    assert_eq!(json["data"]["motorcycles"], json!([]));

    let (status, json) = app
        .post(
            "/api/customers",
            json!({"first_name": "", "last_name": "Byron", "email": "ada@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);
    assert!(json["error_data"]["first_name"].is_array());
    assert!(json["error_data"]["email"].is_array());

    let (status, json) = app.get("/api/customers?search=lovelace").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let app = TestApp::new().await;
    let (status, json) = app
        .get("/api/work-orders/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_supplier_with_parts_cannot_be_deleted() {
    let app = TestApp::new().await;
    let supplier = app.create("/api/suppliers", json!({"name": "Brembo"})).await;
    let supplier_id = supplier["id"].as_str().unwrap();
    app.create(
        "/api/parts",
        json!({
            "supplier_id": supplier_id,
            "sku": "BRK-001",
            "name": "Brake pads",
            "unit_price_cents": 4500,
            "stock_quantity": 10
        }),
    )
    .await;

    let (status, _) = app.delete(&format!("/api/suppliers/{supplier_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app.get(&format!("/api/suppliers/{supplier_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["parts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_work_order_to_paid_invoice() {
    let app = TestApp::new().await;
    let customer = app.customer("rider@example.com").await;
    let motorcycle = app.motorcycle(&customer["id"], "JH2PC35051M200001").await;
    let supplier = app.create("/api/suppliers", json!({"name": "Motul"})).await;
    let part = app
        .create(
            "/api/parts",
            json!({
                "supplier_id": supplier["id"],
                "sku": "OIL-10W40",
                "name": "Engine oil 10W-40",
                "unit_price_cents": 6275,
                "stock_quantity": 3,
                "reorder_level": 1
            }),
        )
        .await;
    let part_id = part["id"].as_str().unwrap();

    let work_order = app
        .create(
            "/api/work-orders",
            json!({
                "motorcycle_id": motorcycle["id"],
                "description": "Oil change",
                "labor_hours": 2.0
            }),
        )
        .await;
    let wo = work_order["id"].as_str().unwrap();

    let (status, _) = app
        .post(
            &format!("/api/work-orders/{wo}/parts"),
            json!({"part_id": part_id, "quantity": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, json) = app.get(&format!("/api/parts/{part_id}")).await;
    assert_eq!(json["data"]["stock_quantity"], 3);

    let line = app
        .create(
            &format!("/api/work-orders/{wo}/parts"),
            json!({"part_id": part_id, "quantity": 2}),
        )
        .await;
    let (_, json) = app.get(&format!("/api/parts/{part_id}")).await;
    assert_eq!(json["data"]["stock_quantity"], 1);

    let (status, _) = app
        .post(&format!("/api/invoices/from-work-order/{wo}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.create(&format!("/api/work-orders/{wo}/complete"), json!({}))
        .await;
    let invoice = app
        .create(
            &format!("/api/invoices/from-work-order/{wo}"),
            json!({"hourly_rate_cents": 8000}),
        )
        .await;
    assert_eq!(invoice["parts_total_cents"], 12_550);
    assert_eq!(invoice["labor_total_cents"], 16_000);
    assert_eq!(invoice["total_cents"], 28_550);
    assert_eq!(invoice["status"], "unpaid");

    let (status, _) = app
        .post(&format!("/api/invoices/from-work-order/{wo}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .delete(&format!(
            "/api/work-orders/{wo}/parts/{}",
            line["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.delete(&format!("/api/work-orders/{wo}")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = app.get("/api/financial/summary").await;
    assert_eq!(json["data"]["outstanding_total_cents"], 28_550);

    let invoice_id = invoice["id"].as_str().unwrap();
    let paid = app
        .create(&format!("/api/invoices/{invoice_id}/mark-paid"), json!({}))
        .await;
    assert_eq!(paid["status"], "paid");
    let (status, _) = app
        .post(&format!("/api/invoices/{invoice_id}/mark-paid"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.delete(&format!("/api/invoices/{invoice_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_removing_part_line_restores_stock() {
    let app = TestApp::new().await;
    let customer = app.customer("rider@example.com").await;
    let motorcycle = app.motorcycle(&customer["id"], "ZDM1UB5V05B000001").await;
    let supplier = app.create("/api/suppliers", json!({"name": "NGK"})).await;
    let part = app
        .create(
            "/api/parts",
            json!({
                "supplier_id": supplier["id"],
                "sku": "SPK-CR9E",
                "name": "Spark plug",
                "unit_price_cents": 1200,
                "stock_quantity": 8
            }),
        )
        .await;
    let part_id = part["id"].as_str().unwrap();
    let work_order = app
        .create(
            "/api/work-orders",
            json!({"motorcycle_id": motorcycle["id"], "description": "Tune-up"}),
        )
        .await;
    let wo = work_order["id"].as_str().unwrap();

    let line = app
        .create(
            &format!("/api/work-orders/{wo}/parts"),
            json!({"part_id": part_id, "quantity": 4}),
        )
        .await;
    let (status, _) = app
        .delete(&format!(
            "/api/work-orders/{wo}/parts/{}",
            line["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/parts/{part_id}")).await;
    assert_eq!(json["data"]["stock_quantity"], 8);
}

#[tokio::test]
async fn test_mechanic_calendar_conflicts_and_conversion() {
    let app = TestApp::new().await;
    let customer = app.customer("rider@example.com").await;
    let motorcycle = app.motorcycle(&customer["id"], "JYARN23E0PA000001").await;
    let mechanic = app
        .create(
            "/api/mechanics",
            json!({
                "first_name": "Sam",
                "last_name": "Wrench",
                "email": "sam@shop.example",
                "hourly_rate_cents": 6000
            }),
        )
        .await;
    let booking = |scheduled_at: &str| {
        json!({
            "customer_id": customer["id"],
            "motorcycle_id": motorcycle["id"],
            "mechanic_id": mechanic["id"],
            "scheduled_at": scheduled_at,
            "duration_minutes": 60,
            "service_type": "Annual service"
        })
    };

    let first = app
        .create("/api/appointments", booking("2030-06-03T10:00:00Z"))
        .await;
    let (status, _) = app
        .post("/api/appointments", booking("2030-06-03T10:30:00Z"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    app.create("/api/appointments", booking("2030-06-03T11:00:00Z"))
        .await;

    let (_, json) = app
        .get("/api/appointments?from=2030-06-03T00:00:00Z&to=2030-06-04T00:00:00Z")
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let appointment_id = first["id"].as_str().unwrap();
    let work_order = app
        .create(
            &format!("/api/appointments/{appointment_id}/work-order"),
            json!({}),
        )
        .await;
    assert_eq!(work_order["motorcycle_id"], motorcycle["id"]);
    let (status, _) = app
        .post(
            &format!("/api/appointments/{appointment_id}/work-order"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = app.get(&format!("/api/appointments/{appointment_id}")).await;
    assert_eq!(json["data"]["status"], "completed");
}

#[tokio::test]
async fn test_portal_is_scoped_to_customer() {
    let app = TestApp::new().await;
    let alice = app.customer("alice@example.com").await;
    let bob = app.customer("bob@example.com").await;
    let bob_bike = app.motorcycle(&bob["id"], "VBKJGJ408KM000001").await;
    let bob_order = app
        .create(
            "/api/work-orders",
            json!({"motorcycle_id": bob_bike["id"], "description": "Chain adjustment"}),
        )
        .await;
    let alice_id = alice["id"].as_str().unwrap();

    let (status, json) = app
        .get(&format!("/api/portal/customers/{alice_id}/work-orders"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([]));

    let (status, _) = app
        .get(&format!(
            "/api/portal/customers/{alice_id}/work-orders/{}",
            bob_order["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            &format!("/api/portal/customers/{alice_id}/appointments"),
            json!({
                "motorcycle_id": bob_bike["id"],
                "scheduled_at": "2030-06-05T09:00:00Z",
                "service_type": "Inspection"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_config_update_is_validated_and_applied() {
    let app = TestApp::new().await;
    let (status, json) = app.get("/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["invoice_prefix"], "INV");

    let mut config = json["data"].clone();
    config["invoice_prefix"] = json!("IN V");
    let (status, json) = app.send("PUT", "/api/config", Some(config.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error_data"]["invoice_prefix"].is_array());

    config["invoice_prefix"] = json!("MRS");
    config["invoice_due_days"] = json!(30);
    let (status, _) = app.send("PUT", "/api/config", Some(config)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get("/api/config").await;
    assert_eq!(json["data"]["invoice_prefix"], "MRS");
    assert_eq!(json["data"]["invoice_due_days"], 30);
}

#[tokio::test]
async fn test_invoice_without_body_uses_configured_rate() {
    let app = TestApp::new().await;
    let customer = app.customer("bodyless@example.com").await;
    let motorcycle = app.motorcycle(&customer["id"], "JH2PC40009M100003").await;

    let work_order = app
        .create(
            "/api/work-orders",
            json!({
                "motorcycle_id": motorcycle["id"],
                "description": "Chain and sprockets",
                "labor_hours": 2.0
            }),
        )
        .await;
    let wo = work_order["id"].as_str().unwrap();
    app.create(&format!("/api/work-orders/{wo}/complete"), json!({}))
        .await;

    let (status, json) = app
        .send("POST", &format!("/api/invoices/from-work-order/{wo}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["hourly_rate_cents"], 8_500);
    assert_eq!(json["data"]["labor_total_cents"], 17_000);

    let session = app
        .create(
            "/api/work-sessions",
            json!({
                "motorcycle_id": motorcycle["id"],
                "description": "Idle diagnosis",
                "labor_hours": 1.0
            }),
        )
        .await;
    let ws = session["id"].as_str().unwrap();
    app.create(&format!("/api/work-sessions/{ws}/complete"), json!({}))
        .await;

    let (status, json) = app
        .send("POST", &format!("/api/invoices/from-work-session/{ws}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["total_cents"], 8_500);
    assert!(
        json["data"]["invoice_number"]
            .as_str()
            .unwrap()
            .ends_with("-00002")
    );
}
