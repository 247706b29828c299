//! Inventory ledger: the only code path that changes a product's stock level
//!
//! Every change is paired with an append-only [`InventoryMovement`] written in
//! the same transaction.

use chrono::Utc;
use shared::models::{InventoryMovement, MovementDirection, MovementReference};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{StoreError, StoreTransaction};

/// A requested stock change
#[derive(Debug, Clone)]
pub struct StockDelta {
    pub product_id: Uuid,
    /// Always positive; `direction` gives the sign
    pub quantity: i32,
    pub direction: MovementDirection,
    pub reference: MovementReference,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Apply a stock delta and record the movement. Returns the new stock level.
///
/// The increment is a single store-side statement, so concurrent deltas on the
/// same product never lose updates. No floor is enforced: stock may go negative.
#[instrument(skip(tx), fields(product_id = %delta.product_id, direction = delta.direction.as_str()))]
pub async fn apply_delta(tx: &mut dyn StoreTransaction, delta: StockDelta) -> AppResult<i32> {
    if delta.quantity <= 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }

    let new_quantity = tx
        .increment_stock(delta.product_id, delta.direction.signed(delta.quantity))
        .await
        .map_err(|err| match err {
            StoreError::OutOfRange { .. } => {
                AppError::validation("quantity", "Stock level would exceed the supported range")
            }
            other => other.into(),
        })?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    tx.insert_movement(&InventoryMovement {
        id: Uuid::new_v4(),
        product_id: delta.product_id,
        direction: delta.direction,
        quantity: delta.quantity,
        reference_type: delta.reference,
        reference_id: delta.reference_id,
        notes: delta.notes,
        created_at: Utc::now(),
    })
    .await?;

    if new_quantity < 0 {
        tracing::warn!(new_quantity, "Stock level is negative");
    }
    tracing::debug!(quantity = delta.quantity, new_quantity, "Stock delta applied");

    Ok(new_quantity)
}
