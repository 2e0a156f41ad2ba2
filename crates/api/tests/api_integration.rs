//! Integration tests for the API server over the in-memory backends.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fulfillment::InMemoryProductionQueue;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use store::MemoryStore;
use tower::ServiceExt;

use api::routes::orders::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Arc<AppState<MemoryStore, InMemoryProductionQueue>>) {
    let state = api::create_memory_state(false).await;
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    customer_header: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(customer) = customer_header {
        builder = builder.header("x-customer-id", customer);
    }

    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_customer(app: &axum::Router, email: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/customers",
        None,
        Some(json!({ "name": "Ana", "email": email, "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn casual_item() -> Value {
    json!({
        "style": "Casual",
        "material": "Couro",
        "sole": "Borracha",
        "color": "Branco",
        "laceDetail": "Cadarço normal"
    })
}

async fn place_order(app: &axum::Router, customer_id: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/orders",
        None,
        Some(json!({ "customerId": customer_id, "items": [casual_item()] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup().await;

    let (status, body) = request(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let (app, _) = setup().await;
    register_customer(&app, "dup@example.com").await;

    let (status, body) = request(
        &app,
        "POST",
        "/customers",
        None,
        Some(json!({ "name": "Bia", "email": "dup@example.com", "password": "correct-horse" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("dup@example.com"));
}

#[tokio::test]
async fn test_short_password_rejected() {
    let (app, _) = setup().await;

    let (status, _) = request(
        &app,
        "POST",
        "/customers",
        None,
        Some(json!({ "name": "Ana", "email": "a@example.com", "password": "short" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_place_order_prices_reference_config() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "price@example.com").await;

    let order = place_order(&app, &customer_id).await;

    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["totalCents"], 38000);
    assert_eq!(order["items"][0]["priceCents"], 38000);
    assert_eq!(order["items"][0]["productionStatus"], "QUEUED");
}

#[tokio::test]
async fn test_place_order_unknown_option_names_step() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "bad@example.com").await;

    let mut item = casual_item();
    item["sole"] = json!("Madeira");
    let (status, body) = request(
        &app,
        "POST",
        "/orders",
        None,
        Some(json!({ "customerId": customer_id, "items": [item] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sole"));
}

#[tokio::test]
async fn test_place_order_unknown_customer_not_found() {
    let (app, _) = setup().await;

    let (status, _) = request(
        &app,
        "POST",
        "/orders",
        None,
        Some(json!({
            "customerId": uuid::Uuid::new_v4().to_string(),
            "items": [casual_item()]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_order_enforces_ownership() {
    let (app, _) = setup().await;
    let owner = register_customer(&app, "owner@example.com").await;
    let other = register_customer(&app, "other@example.com").await;
    let order = place_order(&app, &owner).await;
    let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, _) = request(&app, "GET", &order_uri, Some(other.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&app, "GET", &order_uri, Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customerId"].as_str().unwrap(), owner);
}

#[tokio::test]
async fn test_get_order_missing_header_is_bad_request() {
    let (app, _) = setup().await;
    let owner = register_customer(&app, "hdr@example.com").await;
    let order = place_order(&app, &owner).await;

    let (status, _) = request(
        &app,
        "GET",
        &format!("/orders/{}", order["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_for_customer() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "list@example.com").await;
    place_order(&app, &customer_id).await;
    place_order(&app, &customer_id).await;

    let (status, body) = request(
        &app,
        "GET",
        &format!("/customers/{customer_id}/orders"),
        Some(customer_id.as_str()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_submit_assigns_tracking_codes() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "submit@example.com").await;
    let order = place_order(&app, &customer_id).await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/orders/{}/submit", order["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
    assert!(body["items"][0]["trackingCode"].as_str().is_some());
}

#[tokio::test]
async fn test_finished_callback_completes_order_and_deducts() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "cb@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (_, submitted) = request(&app, "POST", &format!("{order_uri}/submit"), None, None).await;
    let tracking = submitted["items"][0]["trackingCode"].as_str().unwrap();

    let (status, body) = request(
        &app,
        "POST",
        "/callbacks/production",
        None,
        Some(json!({ "id": tracking, "status": "FINISHED", "slot": "EXP-01" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["orderStatus"], "COMPLETED");

    let (_, order) = request(&app, "GET", &order_uri, Some(customer_id.as_str()), None).await;
    assert_eq!(order["status"], "COMPLETED");
    assert_eq!(order["items"][0]["productionStatus"], "READY");

    let (_, inventory) = request(&app, "GET", "/inventory", None, None).await;
    for code in ["B1", "M1", "S1", "L1", "D1"] {
        let item = inventory
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["code"] == code)
            .unwrap();
        assert_eq!(item["quantityOnHand"], 99, "code {code}");
    }
}

#[tokio::test]
async fn test_duplicate_callback_applies_once() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "dupcb@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let (_, submitted) = request(
        &app,
        "POST",
        &format!("/orders/{}/submit", order["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;
    let tracking = submitted["items"][0]["trackingCode"].as_str().unwrap();
    let callback = json!({ "id": tracking, "status": "FINISHED", "slot": "EXP-01" });

    let (_, first) = request(&app, "POST", "/callbacks/production", None, Some(callback.clone())).await;
    let (status, second) = request(&app, "POST", "/callbacks/production", None, Some(callback)).await;

    assert_eq!(first["applied"], true);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["applied"], false);

    let (_, inventory) = request(&app, "GET", "/inventory", None, None).await;
    let b1 = inventory
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["code"] == "B1")
        .unwrap();
    assert_eq!(b1["quantityOnHand"], 99);
}

#[tokio::test]
async fn test_callback_unknown_tracking_not_found() {
    let (app, _) = setup().await;

    let (status, _) = request(
        &app,
        "POST",
        "/callbacks/production",
        None,
        Some(json!({ "id": "PRD-9999", "status": "FINISHED", "slot": "EXP-01" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_other_status_acknowledged() {
    let (app, _) = setup().await;

    let (status, body) = request(
        &app,
        "POST",
        "/callbacks/production",
        None,
        Some(json!({ "id": "PRD-9999", "status": "IN_PROGRESS" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acknowledged"], true);
    assert_eq!(body["applied"], false);
}

#[tokio::test]
async fn test_delivery_flow_releases_slot() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "deliver@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, submitted) = request(&app, "POST", &format!("/orders/{order_id}/submit"), None, None).await;
    let tracking = submitted["items"][0]["trackingCode"].as_str().unwrap();
    request(
        &app,
        "POST",
        "/callbacks/production",
        None,
        Some(json!({ "id": tracking, "status": "FINISHED", "slot": "EXP-01" })),
    )
    .await;

    let (_, free) = request(&app, "GET", "/slots/free", None, None).await;
    assert_eq!(free["free"], 7);

    let (status, body) = request(&app, "POST", &format!("/orders/{order_id}/delivery"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DELIVERED");

    let (_, free) = request(&app, "GET", "/slots/free", None, None).await;
    assert_eq!(free["free"], 8);
}

#[tokio::test]
async fn test_delivery_before_completion_conflicts() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "early@example.com").await;
    let order = place_order(&app, &customer_id).await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/orders/{}/delivery", order["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_pending_order() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "cancel@example.com").await;
    let order = place_order(&app, &customer_id).await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/orders/{}/cancel", order["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
}

#[tokio::test]
async fn test_cancelled_order_rejects_submission() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "cancel-submit@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, _) = request(&app, "POST", &format!("{order_uri}/cancel"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, "POST", &format!("{order_uri}/submit"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("cannot be submitted"));

    // No tracking code was handed out, so no slot can ever be taken.
    let (_, free) = request(&app, "GET", "/slots/free", None, None).await;
    assert_eq!(free["free"], 8);
}

#[tokio::test]
async fn test_edit_item_reprices_order() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "edit@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let order_id = order["id"].as_str().unwrap();
    let item_id = order["items"][0]["id"].as_str().unwrap();

    let mut item = casual_item();
    item["style"] = json!("Skate");
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/orders/{order_id}/items/{item_id}"),
        Some(customer_id.as_str()),
        Some(item),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // Skate style carries a 30000 surcharge instead of Casual's 20000.
    assert_eq!(body["totalCents"], 48000);
}

#[tokio::test]
async fn test_remove_last_item_deletes_order() {
    let (app, _) = setup().await;
    let customer_id = register_customer(&app, "remove@example.com").await;
    let order = place_order(&app, &customer_id).await;
    let order_id = order["id"].as_str().unwrap();
    let item_id = order["items"][0]["id"].as_str().unwrap();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/orders/{order_id}/items/{item_id}"),
        Some(customer_id.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(
        &app,
        "GET",
        &format!("/orders/{order_id}"),
        Some(customer_id.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_restock() {
    let (app, _) = setup().await;

    let (_, inventory) = request(&app, "GET", "/inventory", None, None).await;
    let b1 = inventory
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["code"] == "B1")
        .unwrap();
    let id = b1["id"].as_str().unwrap();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/inventory/{id}/restock"),
        None,
        Some(json!({ "quantity": 25 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantityOnHand"], 125);
}

#[tokio::test]
async fn test_restock_zero_quantity_rejected() {
    let (app, _) = setup().await;

    let (_, inventory) = request(&app, "GET", "/inventory", None, None).await;
    let id = inventory.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/inventory/{id}/restock"),
        None,
        Some(json!({ "quantity": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("positive"));
}
