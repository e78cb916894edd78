//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PageLimits;
use crate::domain::{DomainError, ErrorCode, OperationContext};
use crate::error::AppError;
use crate::handlers::{
    CreateClientCommand, CreatePaymentCommand, CreatePurchaseCommand, NewPayment,
    UpdateClientCommand, UpdatePaymentCommand, UpdatePurchaseCommand,
};
use crate::model::{Client, ClientChanges, Payment, Purchase};
use crate::store::{ClientFilter, PageRequest, PaymentFilter, PurchaseFilter};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub description: String,
    pub total_value: Decimal,
    #[serde(default)]
    pub note_number: Option<String>,
    #[serde(default)]
    pub initial_payment: Option<NewPayment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePurchaseRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_value: Option<Decimal>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    /// Only accepted to be refused: activation has its own routes
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaymentRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Query for `/clients` and `/clients/:id/purchases`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub outstanding_only: bool,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_inactive: bool,
    pub purchase_id: Option<Uuid>,
}

// =========================================================================
// Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub message: &'static str,
    pub client: Client,
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub message: &'static str,
    pub clients: Vec<Client>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub message: &'static str,
    pub purchase: Purchase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseListResponse {
    pub message: &'static str,
    pub purchases: Vec<Purchase>,
}

/// Payment plus the purchase it settled
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub message: &'static str,
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<Purchase>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub message: &'static str,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub message: &'static str,
    pub deactivated: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

fn purchase_response(message: &'static str, purchase: Purchase) -> Json<PurchaseResponse> {
    Json(PurchaseResponse {
        message,
        purchase,
        payment: None,
    })
}

/// Resolve the requested page window against the configured bounds
fn page(limits: PageLimits, limit: Option<i64>, offset: Option<i64>) -> Result<PageRequest, AppError> {
    let limit = limit.unwrap_or(limits.default_limit);
    let offset = offset.unwrap_or(0);

    if limit < 0 || offset < 0 {
        return Err(AppError::InvalidRequest(
            "limit and offset must not be negative".to_string(),
        ));
    }

    Ok(PageRequest::new(limit.min(limits.max_limit), offset))
}

// =========================================================================
// Routes
// =========================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Clients
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:client_id",
            get(get_client).patch(update_client).delete(deactivate_client),
        )
        .route("/clients/:client_id/activate", post(activate_client))
        .route(
            "/clients/:client_id/purchases",
            get(list_client_purchases).post(create_purchase),
        )
        // Purchases
        .route("/purchases", get(list_purchases))
        .route("/purchases/by-note/:note_number", get(get_purchase_by_note))
        .route(
            "/purchases/:purchase_id",
            get(get_purchase).patch(update_purchase).delete(deactivate_purchase),
        )
        .route("/purchases/:purchase_id/activate", post(activate_purchase))
        // Payments
        .route(
            "/purchases/:purchase_id/payments",
            get(list_purchase_payments).post(create_payment),
        )
        .route(
            "/purchases/:purchase_id/payments/:payment_id",
            get(get_payment).patch(update_payment).delete(deactivate_payment),
        )
        .route(
            "/purchases/:purchase_id/payments/:payment_id/activate",
            post(activate_payment),
        )
        .route("/payments", get(list_payments))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await.map_err(DomainError::from)?;
    Ok(Json(HealthResponse { status: "ok" }))
}

// =========================================================================
// Client handlers
// =========================================================================

async fn create_client(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    let command = CreateClientCommand {
        name: req.name,
        nickname: req.nickname,
        phone: req.phone,
        email: req.email,
    };

    let client = state.clients.create(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(ClientResponse {
            message: "Client created successfully.",
            client,
        }),
    ))
}

async fn list_clients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ClientListResponse>, AppError> {
    let page = page(state.page_limits, query.limit, query.offset)?;
    let filter = ClientFilter {
        include_inactive: query.include_inactive,
    };

    let clients = state.clients.list(filter, page).await?;
    let message = if clients.is_empty() {
        "No clients found."
    } else {
        "Clients found."
    };

    Ok(Json(ClientListResponse { message, clients }))
}

async fn get_client(
    State(state): State<AppState>,
    ApiPath(client_id): ApiPath<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state.clients.get(client_id).await?;
    Ok(Json(ClientResponse {
        message: "Client found.",
        client,
    }))
}

async fn update_client(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(client_id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ClientChanges>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state
        .clients
        .update(UpdateClientCommand::new(client_id, changes), &context)
        .await?;

    Ok(Json(ClientResponse {
        message: "Client updated successfully.",
        client,
    }))
}

async fn deactivate_client(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(client_id): ApiPath<Uuid>,
) -> Result<Json<DeactivateResponse>, AppError> {
    let deactivated = state.cascade.deactivate_client(client_id, &context).await?;
    let message = if deactivated {
        "Client and related records deactivated successfully."
    } else {
        "Client was already inactive."
    };

    Ok(Json(DeactivateResponse {
        message,
        deactivated,
    }))
}

async fn activate_client(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(client_id): ApiPath<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state.cascade.activate_client(client_id, &context).await?;
    Ok(Json(ClientResponse {
        message: "Client activated successfully.",
        client,
    }))
}

async fn list_client_purchases(
    State(state): State<AppState>,
    ApiPath(client_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<PurchaseListResponse>, AppError> {
    let page = page(state.page_limits, query.limit, query.offset)?;
    let purchases = state
        .clients
        .list_purchases(client_id, query.include_inactive, page)
        .await?;

    Ok(Json(purchase_list(purchases)))
}

// =========================================================================
// Purchase handlers
// =========================================================================

async fn create_purchase(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(client_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let command = CreatePurchaseCommand {
        client_id,
        description: req.description,
        total_value: req.total_value,
        note_number: req.note_number,
        initial_payment: req.initial_payment,
    };

    let result = state.purchases.create(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            message: "Purchase created successfully.",
            purchase: result.purchase,
            payment: result.initial_payment,
        }),
    ))
}

fn purchase_list(purchases: Vec<Purchase>) -> PurchaseListResponse {
    let message = if purchases.is_empty() {
        "No purchases found."
    } else {
        "Purchases found."
    };
    PurchaseListResponse { message, purchases }
}

async fn list_purchases(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PurchaseListQuery>,
) -> Result<Json<PurchaseListResponse>, AppError> {
    let page = page(state.page_limits, query.limit, query.offset)?;
    let filter = PurchaseFilter {
        client_id: query.client_id,
        include_inactive: query.include_inactive,
        outstanding_only: query.outstanding_only,
    };

    let purchases = state.purchases.list(filter, page).await?;
    Ok(Json(purchase_list(purchases)))
}

async fn get_purchase(
    State(state): State<AppState>,
    ApiPath(purchase_id): ApiPath<Uuid>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let purchase = state.purchases.get(purchase_id).await?;
    Ok(purchase_response("Purchase found.", purchase))
}

async fn get_purchase_by_note(
    State(state): State<AppState>,
    ApiPath(note_number): ApiPath<String>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let purchase = state.purchases.get_by_note_number(&note_number).await?;
    Ok(purchase_response("Purchase found.", purchase))
}

async fn update_purchase(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(purchase_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePurchaseRequest>,
) -> Result<Json<PurchaseResponse>, AppError> {
    if req.is_active.is_some() {
        return Err(DomainError::invalid(ErrorCode::PurchaseInvalidActivationRoute).into());
    }

    let command = UpdatePurchaseCommand {
        purchase_id,
        description: req.description,
        total_value: req.total_value,
        client_id: req.client_id,
    };

    let purchase = state.purchases.update(command, &context).await?;
    Ok(purchase_response("Purchase updated successfully.", purchase))
}

async fn deactivate_purchase(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(purchase_id): ApiPath<Uuid>,
) -> Result<Json<DeactivateResponse>, AppError> {
    let deactivated = state
        .cascade
        .deactivate_purchase(purchase_id, &context)
        .await?;
    let message = if deactivated {
        "Purchase and its payments deactivated successfully."
    } else {
        "Purchase was already inactive."
    };

    Ok(Json(DeactivateResponse {
        message,
        deactivated,
    }))
}

async fn activate_purchase(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(purchase_id): ApiPath<Uuid>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let purchase = state.cascade.activate_purchase(purchase_id, &context).await?;
    Ok(purchase_response("Purchase activated successfully.", purchase))
}

// =========================================================================
// Payment handlers
// =========================================================================

fn payment_list(payments: Vec<Payment>) -> PaymentListResponse {
    let message = if payments.is_empty() {
        "No payments found."
    } else {
        "Payments found."
    };
    PaymentListResponse { message, payments }
}

async fn create_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(purchase_id): ApiPath<Uuid>,
    ApiJson(payment): ApiJson<NewPayment>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let result = state
        .payments
        .create(CreatePaymentCommand::new(purchase_id, payment), &context)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            message: "Payment recorded successfully.",
            payment: result.payment,
            purchase: Some(result.purchase),
        }),
    ))
}

async fn list_purchase_payments(
    State(state): State<AppState>,
    ApiPath(purchase_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let page = page(state.page_limits, query.limit, query.offset)?;
    let filter = PaymentFilter {
        purchase_id: Some(purchase_id),
        include_inactive: query.include_inactive,
    };

    let payments = state.payments.list(filter, page).await?;
    Ok(Json(payment_list(payments)))
}

async fn list_payments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let page = page(state.page_limits, query.limit, query.offset)?;
    let filter = PaymentFilter {
        purchase_id: query.purchase_id,
        include_inactive: query.include_inactive,
    };

    let payments = state.payments.list(filter, page).await?;
    Ok(Json(payment_list(payments)))
}

async fn get_payment(
    State(state): State<AppState>,
    ApiPath((purchase_id, payment_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state.payments.get(purchase_id, payment_id).await?;
    Ok(Json(PaymentResponse {
        message: "Payment found.",
        payment,
        purchase: None,
    }))
}

async fn update_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath((purchase_id, payment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdatePaymentRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let command = UpdatePaymentCommand {
        purchase_id,
        payment_id,
        amount: req.amount,
        payment_date: req.payment_date,
        method: req.method,
        description: req.description,
    };

    let result = state.payments.update(command, &context).await?;
    Ok(Json(PaymentResponse {
        message: "Payment updated successfully.",
        payment: result.payment,
        purchase: Some(result.purchase),
    }))
}

async fn deactivate_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath((purchase_id, payment_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<DeactivateResponse>, AppError> {
    let deactivated = state
        .payments
        .deactivate(purchase_id, payment_id, &context)
        .await?;
    let message = if deactivated {
        "Payment deactivated successfully."
    } else {
        "Payment was already inactive."
    };

    Ok(Json(DeactivateResponse {
        message,
        deactivated,
    }))
}

async fn activate_payment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath((purchase_id, payment_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<PaymentResponse>, AppError> {
    let result = state
        .payments
        .activate(purchase_id, payment_id, &context)
        .await?;

    Ok(Json(PaymentResponse {
        message: "Payment activated successfully.",
        payment: result.payment,
        purchase: Some(result.purchase),
    }))
}
