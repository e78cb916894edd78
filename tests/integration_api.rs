//! API Integration Tests
//!
//! End-to-end requests through the router against the in-memory store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal_macros::dec;
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

use common::{create_client, create_purchase, decimal, pay, send, test_app};

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_client_create_get_and_duplicate_nickname() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/clients",
        Some(json!({ "name": "João Silva", "nickname": "  Joao  ", "phone": "11999999999" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Client created successfully.");
    assert_eq!(body["client"]["nickname"], "joao");
    assert_eq!(body["client"]["is_active"], true);

    let id = body["client"]["id"].as_str().unwrap();
    let (status, body) = send(&app, "GET", &format!("/clients/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client"]["name"], "João Silva");

    // Same nickname after normalization
    let (status, body) = send(
        &app,
        "POST",
        "/clients",
        Some(json!({ "name": "Outro", "nickname": "JOAO" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CLIENT_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_payments_drive_purchase_status() {
    let app = test_app();
    let client_id = create_client(&app, "Maria Souza", "maria").await;
    let purchase_id = create_purchase(&app, &client_id, "150.00").await;

    let (status, body) = send(&app, "GET", &format!("/purchases/{purchase_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purchase"]["status"], "pending");
    assert_eq!(decimal(&body["purchase"]["total_paid_value"]), dec!(0));

    let (first, purchase) = pay(&app, &purchase_id, "50.00").await;
    assert_eq!(purchase["status"], "partial");
    assert_eq!(decimal(&purchase["total_paid_value"]), dec!(50));

    let (_, purchase) = pay(&app, &purchase_id, "100.00").await;
    assert_eq!(purchase["status"], "paid");
    assert_eq!(decimal(&purchase["total_paid_value"]), dec!(150));

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/purchases/{purchase_id}/payments/{first}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], true);

    let (_, body) = send(&app, "GET", &format!("/purchases/{purchase_id}"), None).await;
    assert_eq!(body["purchase"]["status"], "partial");
    assert_eq!(decimal(&body["purchase"]["total_paid_value"]), dec!(100));

    // Second deactivation is a no-op
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/purchases/{purchase_id}/payments/{first}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], false);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/purchases/{purchase_id}/payments/{first}/activate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purchase"]["status"], "paid");
}

#[tokio::test]
async fn test_create_purchase_with_initial_payment() {
    let app = test_app();
    let client_id = create_client(&app, "João Silva", "joao").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/clients/{client_id}/purchases"),
        Some(json!({
            "description": "Compra de sementes",
            "total_value": "100",
            "note_number": "NF-0001",
            "initial_payment": { "amount": "50", "method": "Pix", "receipt_number": "REC-0001" }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["purchase"]["status"], "partial");
    assert_eq!(decimal(&body["purchase"]["total_paid_value"]), dec!(50));
    assert_eq!(body["payment"]["receipt_number"], "REC-0001");

    let (status, body) = send(&app, "GET", "/purchases/by-note/NF-0001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purchase"]["note_number"], "NF-0001");

    // Duplicate note number rolls back the whole creation
    let (status, body) = send(
        &app,
        "POST",
        &format!("/clients/{client_id}/purchases"),
        Some(json!({
            "description": "Repetida",
            "total_value": "10",
            "note_number": "NF-0001",
            "initial_payment": { "amount": "10", "method": "Pix", "receipt_number": "REC-0099" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "PURCHASE_ALREADY_EXISTS");

    let (_, body) = send(&app, "GET", "/payments", None).await;
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_deactivation_cascades() {
    let app = test_app();
    let client_id = create_client(&app, "Carlos Lima", "carlos").await;
    let first = create_purchase(&app, &client_id, "200").await;
    let second = create_purchase(&app, &client_id, "80").await;
    pay(&app, &first, "120").await;
    pay(&app, &second, "80").await;

    let (status, body) = send(&app, "DELETE", &format!("/clients/{client_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], true);

    for purchase_id in [&first, &second] {
        let (_, body) = send(&app, "GET", &format!("/purchases/{purchase_id}"), None).await;
        assert_eq!(body["purchase"]["is_active"], false);
        assert_eq!(body["purchase"]["status"], "pending");
        assert_eq!(decimal(&body["purchase"]["total_paid_value"]), dec!(0));

        let (_, body) = send(
            &app,
            "GET",
            &format!("/purchases/{purchase_id}/payments?include_inactive=true"),
            None,
        )
        .await;
        let payments = body["payments"].as_array().unwrap();
        assert_eq!(payments.len(), 1);
        assert!(payments.iter().all(|p| p["is_active"] == false));
    }

    // Default listings hide the retired tree
    let (_, body) = send(&app, "GET", "/purchases", None).await;
    assert_eq!(body["message"], "No purchases found.");
    assert!(body["purchases"].as_array().unwrap().is_empty());

    // A purchase of an inactive client cannot come back, nor take payments
    let (status, body) = send(&app, "POST", &format!("/purchases/{first}/activate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CLIENT_INACTIVE");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/purchases/{first}/payments"),
        Some(json!({ "amount": "10", "method": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "PAYMENT_PURCHASE_INACTIVE");

    let (_, body) = send(&app, "DELETE", &format!("/clients/{client_id}"), None).await;
    assert_eq!(body["deactivated"], false);

    let (status, body) = send(&app, "POST", &format!("/clients/{client_id}/activate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client"]["is_active"], true);
}

#[tokio::test]
async fn test_update_purchase_total_resettles() {
    let app = test_app();
    let client_id = create_client(&app, "Ana", "ana").await;
    let purchase_id = create_purchase(&app, &client_id, "100").await;
    pay(&app, &purchase_id, "100").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/purchases/{purchase_id}"),
        Some(json!({ "total_value": "250" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purchase"]["status"], "partial");
    assert_eq!(decimal(&body["purchase"]["total_value"]), dec!(250));

    let (status, body) = send(&app, "PATCH", &format!("/purchases/{purchase_id}"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "DATA_FIELDS_EMPTY");

    // Activation state only changes through its own routes
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/purchases/{purchase_id}"),
        Some(json!({ "is_active": false, "description": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PURCHASE_INVALID_ACTIVATION_ROUTE");

    let (_, body) = send(&app, "GET", &format!("/purchases/{purchase_id}"), None).await;
    assert_eq!(body["purchase"]["is_active"], true);
    assert_eq!(body["purchase"]["description"], "Compra");
}

#[tokio::test]
async fn test_validation_errors() {
    let app = test_app();
    let client_id = create_client(&app, "Bia", "bia").await;
    let purchase_id = create_purchase(&app, &client_id, "50").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/purchases/{purchase_id}/payments"),
        Some(json!({ "amount": "0", "method": "Pix" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PAYMENT_INVALID_AMOUNT");

    // A payment always names how it was paid
    let (status, body) = send(
        &app,
        "POST",
        &format!("/purchases/{purchase_id}/payments"),
        Some(json!({ "amount": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/purchases/{purchase_id}/payments"),
        Some(json!({ "amount": "10", "method": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PAYMENT_INVALID_METHOD");

    let (payment_id, _) = pay(&app, &purchase_id, "10").await;
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/purchases/{purchase_id}/payments/{payment_id}"),
        Some(json!({ "method": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PAYMENT_INVALID_METHOD");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/clients/{client_id}/purchases"),
        Some(json!({ "description": "x", "total_value": "-5" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PURCHASE_INVALID_TOTAL");

    let (status, body) = send(&app, "POST", "/clients", Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "CLIENT_INVALID_NAME");

    let (status, body) = send(&app, "GET", "/clients/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");

    let (status, body) = send(&app, "GET", "/clients?limit=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/clients")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_not_found_and_linkage() {
    let app = test_app();
    let missing = Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/purchases/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "PURCHASE_NOT_FOUND");
    assert_eq!(body["error"], "Purchase not found.");

    let (status, _) = send(&app, "GET", &format!("/purchases/{missing}/payments"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let client_id = create_client(&app, "Caio", "caio").await;
    let first = create_purchase(&app, &client_id, "40").await;
    let second = create_purchase(&app, &client_id, "40").await;
    let (payment_id, _) = pay(&app, &first, "10").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/purchases/{second}/payments/{payment_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "PAYMENT_NOT_LINKED");
}

#[tokio::test]
async fn test_empty_list_message() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/clients", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No clients found.");
    assert!(body["clients"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = test_app();
    let correlation_id = Uuid::new_v4().to_string();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-correlation-id", &correlation_id)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        correlation_id.as_str()
    );

    // A fresh id is minted when none is sent
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let header = response.headers().get("x-correlation-id").unwrap();
    assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
}
