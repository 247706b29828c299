//! Route definitions for the Agrivet purchasing API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/purchase-order-items", purchase_order_item_routes())
        .nest("/products", product_routes())
}

/// Purchase order routes
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:order_id", get(handlers::get_purchase_order))
        .route("/:order_id/approve", post(handlers::approve_purchase_order))
        .route("/:order_id/cancel", post(handlers::cancel_purchase_order))
        .route("/:order_id/reconcile", post(handlers::reconcile_purchase_order))
}

/// Receiving routes
fn purchase_order_item_routes() -> Router<AppState> {
    Router::new().route(
        "/:item_id/receive",
        post(handlers::receive_purchase_order_item),
    )
}

/// Product stock routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/movements", get(handlers::list_product_movements))
        .route("/:product_id/adjust-stock", post(handlers::adjust_stock))
}
