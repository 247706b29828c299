//! Inventory service for stock lookups, movement history and manual adjustments

use std::sync::Arc;

use serde::Deserialize;
use shared::models::{InventoryMovement, MovementDirection, MovementReference, Product};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::finish;
use super::ledger::{self, StockDelta};
use crate::error::{AppError, AppResult};
use crate::store::{DataStore, StoreTransaction};

/// Inventory service for reading stock and applying manual adjustments
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn DataStore>,
}

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustStockInput {
    pub direction: MovementDirection,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Get a product with its current stock level
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut tx = self.store.begin().await?;
        let result = find_product(tx.as_mut(), product_id).await;
        finish(tx, result).await
    }

    /// List stock movements for a product, newest first
    pub async fn list_movements(&self, product_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        let mut tx = self.store.begin().await?;
        let result: AppResult<Vec<InventoryMovement>> = async {
            find_product(tx.as_mut(), product_id).await?;
            Ok(tx.list_movements(product_id).await?)
        }
        .await;
        finish(tx, result).await
    }

    /// Adjust stock by hand (stock count corrections, damaged goods, ...)
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, product_id: Uuid, input: AdjustStockInput) -> AppResult<Product> {
        input.validate()?;

        let delta = StockDelta {
            product_id,
            quantity: input.quantity,
            direction: input.direction,
            reference: MovementReference::Adjustment,
            reference_id: None,
            notes: input.notes,
        };

        let mut tx = self.store.begin().await?;
        let result: AppResult<Product> = async {
            ledger::apply_delta(tx.as_mut(), delta).await?;
            find_product(tx.as_mut(), product_id).await
        }
        .await;
        let product = finish(tx, result).await?;

        tracing::info!(stock_quantity = product.stock_quantity, "Stock adjusted");
        Ok(product)
    }
}

async fn find_product(tx: &mut dyn StoreTransaction, product_id: Uuid) -> AppResult<Product> {
    tx.find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}
