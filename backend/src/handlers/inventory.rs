//! HTTP handlers for product stock endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::models::{InventoryMovement, Product};
use shared::types::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::inventory::{AdjustStockInput, InventoryService};
use crate::AppState;

/// Get a product with its stock level
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = InventoryService::new(state.store);
    let product = service.get_product(product_id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// List stock movements for a product
pub async fn list_product_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<InventoryMovement>>>> {
    let service = InventoryService::new(state.store);
    let movements = service.list_movements(product_id).await?;
    Ok(Json(ApiResponse::ok(movements)))
}

/// Manually adjust a product's stock
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = InventoryService::new(state.store);
    let product = service.adjust_stock(product_id, input).await?;
    Ok(Json(ApiResponse::with_message(product, "Stock adjusted")))
}
