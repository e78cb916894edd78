//! API module
//!
//! HTTP API endpoints and middleware.

pub mod extract;
pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::PageLimits;
use crate::handlers::{CascadeHandler, ClientHandler, PaymentHandler, PurchaseHandler};
use crate::store::SharedStore;

pub use routes::create_router;

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub clients: ClientHandler,
    pub purchases: PurchaseHandler,
    pub payments: PaymentHandler,
    pub cascade: CascadeHandler,
    pub page_limits: PageLimits,
}

impl AppState {
    pub fn new(store: SharedStore, page_limits: PageLimits) -> Self {
        Self {
            clients: ClientHandler::new(store.clone()),
            purchases: PurchaseHandler::new(store.clone()),
            payments: PaymentHandler::new(store.clone()),
            cascade: CascadeHandler::new(store.clone()),
            store,
            page_limits,
        }
    }
}

/// Build the application router
pub fn build_router(store: SharedStore, page_limits: PageLimits) -> Router {
    let state = AppState::new(store, page_limits);

    Router::new()
        .route("/health", get(routes::health_check))
        .merge(create_router())
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::context_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
