//! HTTP handlers for purchase order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{PurchaseOrder, PurchaseOrderFilter, PurchaseOrderWithItems};
use shared::types::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::purchase_order::{
    ApproveOrderInput, CreatePurchaseOrderInput, ItemReceipt, PurchaseOrderService,
    ReceiveItemInput,
};
use crate::services::reconciler::ReconcileOutcome;
use crate::AppState;

/// Create a purchase order
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<PurchaseOrderWithItems>>)> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.create_order(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(order, "Purchase order created")),
    ))
}

/// List purchase orders, optionally filtered by status or supplier
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<ApiResponse<Vec<PurchaseOrder>>>> {
    let service = PurchaseOrderService::new(state.store);
    let orders = service.list_orders(filter).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// Get a purchase order with its items
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrderWithItems>>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.get_order(order_id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// Approve a purchase order
pub async fn approve_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ApproveOrderInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.approve_order(order_id, input).await?;
    Ok(Json(ApiResponse::with_message(order, "Purchase order approved")))
}

/// Cancel a purchase order
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.cancel_order(order_id).await?;
    Ok(Json(ApiResponse::with_message(order, "Purchase order cancelled")))
}

/// Re-check whether a purchase order is fully received
pub async fn reconcile_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReconcileResponse>>> {
    let service = PurchaseOrderService::new(state.store);
    let outcome = service.reconcile_order(order_id).await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// Receive goods against a purchase order item
pub async fn receive_purchase_order_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(input): Json<ReceiveItemInput>,
) -> AppResult<Json<ApiResponse<ItemReceipt>>> {
    let service = PurchaseOrderService::new(state.store);
    let receipt = service.receive_item(item_id, input).await?;
    Ok(Json(ApiResponse::with_message(receipt, "Item received")))
}

/// Response for a reconciliation request
#[derive(Debug, serde::Serialize)]
pub struct ReconcileResponse {
    pub status: shared::models::PurchaseOrderStatus,
    pub transitioned: bool,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            status: outcome.status,
            transitioned: outcome.transitioned,
        }
    }
}
