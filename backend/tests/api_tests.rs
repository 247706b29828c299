//! HTTP API tests
//!
//! Drive the router directly and check status codes and the response envelope.

mod common;

use std::str::FromStr;

use agrivet_purchasing::create_app;
use agrivet_purchasing::store::InMemoryStore;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

async fn setup() -> (InMemoryStore, Router, Uuid) {
    let store = InMemoryStore::new();
    let product = store.insert_product("SEED-CORN", "Hybrid corn seed 1kg", 0).await;
    let app = create_app(app_state(&store));
    (store, app, product.id)
}

fn create_body(product_id: Uuid) -> Value {
    json!({
        "supplier_id": Uuid::new_v4(),
        "items": [
            { "product_id": product_id, "quantity_ordered": 10, "unit_cost": "5.00" }
        ]
    })
}

#[tokio::test]
async fn test_health() {
    let (_, app, _) = setup().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_receiving_flow_over_http() {
    let (_, app, product_id) = setup().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/purchase-orders",
        Some(create_body(product_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "draft");
    assert_eq!(money(&body["data"]["subtotal"]), dec("50.00"));
    assert_eq!(money(&body["data"]["tax_amount"]), dec("6.00"));
    assert_eq!(money(&body["data"]["total_amount"]), dec("56.00"));

    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/approve", order_id),
        Some(json!({ "approved_by": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let receive_uri = format!("/api/v1/purchase-order-items/{}/receive", item_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &receive_uri,
        Some(json!({ "quantity_received": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["item"]["quantity_received"], 6);
    assert_eq!(body["data"]["is_fully_received"], false);
    assert_eq!(body["data"]["order_status"], "confirmed");

    let (status, body) = send(
        &app,
        Method::POST,
        &receive_uri,
        Some(json!({ "quantity_received": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_fully_received"], true);
    assert_eq!(body["data"]["order_status"], "received");
    assert_eq!(body["data"]["stock_quantity"], 10);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/purchase-orders/{}", order_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "received");
    assert_eq!(body["data"]["items"][0]["quantity_received"], 10);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/products/{}/movements", product_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/reconcile", order_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "received");
    assert_eq!(body["data"]["transitioned"], false);
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let (_, app, product_id) = setup().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/purchase-orders",
        Some(json!({ "supplier_id": Uuid::new_v4(), "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "items");
    assert!(body.get("data").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/purchase-orders",
        Some(create_body(product_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-order-items/{}/receive", item_id),
        Some(json!({ "quantity_received": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "quantity_received");
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let (_, app, _) = setup().await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/approve", Uuid::new_v4()),
        Some(json!({ "approved_by": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-order-items/{}/receive", Uuid::new_v4()),
        Some(json!({ "quantity_received": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/products/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_receiving_cancelled_order_is_unprocessable() {
    let (store, app, product_id) = setup().await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/v1/purchase-orders",
        Some(create_body(product_id)),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/cancel", order_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/purchase-order-items/{}/receive", item_id),
        Some(json!({ "quantity_received": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
    assert_eq!(store.product(product_id).await.unwrap().stock_quantity, 0);
}

#[tokio::test]
async fn test_list_orders_filtered_by_status() {
    let (_, app, product_id) = setup().await;

    for _ in 0..2 {
        send(
            &app,
            Method::POST,
            "/api/v1/purchase-orders",
            Some(create_body(product_id)),
        )
        .await;
    }

    let (status, body) = send(&app, Method::GET, "/api/v1/purchase-orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/purchase-orders?status=confirmed",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_adjust_stock_endpoint() {
    let (_, app, product_id) = setup().await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/products/{}/adjust-stock", product_id),
        Some(json!({ "direction": "in", "quantity": 12, "notes": "Opening count" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], 12);
    assert_eq!(body["message"], "Stock adjusted");
}
