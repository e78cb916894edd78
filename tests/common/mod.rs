//! Common test utilities

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::util::ServiceExt;

use purchase_ledger::api;
use purchase_ledger::config::PageLimits;
use purchase_ledger::MemoryStore;

/// Router over a fresh in-memory store
pub fn test_app() -> Router {
    api::build_router(Arc::new(MemoryStore::new()), PageLimits::default())
}

/// Send one request and return the status and the decoded JSON body
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    let req = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Money fields are serialized as strings
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

/// Create a client and return its id
pub async fn create_client(app: &Router, name: &str, nickname: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/clients",
        Some(serde_json::json!({ "name": name, "nickname": nickname })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "client creation failed: {body}");
    body["client"]["id"].as_str().unwrap().to_string()
}

/// Create a purchase without an initial payment and return its id
pub async fn create_purchase(app: &Router, client_id: &str, total_value: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/clients/{client_id}/purchases"),
        Some(serde_json::json!({ "description": "Compra", "total_value": total_value })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "purchase creation failed: {body}");
    body["purchase"]["id"].as_str().unwrap().to_string()
}

/// Record a payment and return (payment id, purchase body after settling)
pub async fn pay(app: &Router, purchase_id: &str, amount: &str) -> (String, Value) {
    let (status, body) = send(
        app,
        "POST",
        &format!("/purchases/{purchase_id}/payments"),
        Some(serde_json::json!({ "amount": amount, "method": "pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "payment failed: {body}");
    (
        body["payment"]["id"].as_str().unwrap().to_string(),
        body["purchase"].clone(),
    )
}
