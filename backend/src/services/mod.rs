//! Business logic services for the Agrivet purchasing platform
//!
//! `ledger`, `receiving` and `reconciler` are the building blocks of the
//! receive-item workflow. They operate on an open [`StoreTransaction`] and
//! never commit on their own; the service structs own the transaction
//! boundary.

pub mod inventory;
pub mod ledger;
pub mod purchase_order;
pub mod receiving;
pub mod reconciler;

pub use inventory::InventoryService;
pub use purchase_order::PurchaseOrderService;

use crate::error::AppResult;
use crate::store::StoreTransaction;

/// Commit `tx` if `result` is Ok, roll it back otherwise.
///
/// The original error wins over a failed rollback.
pub(crate) async fn finish<T>(tx: Box<dyn StoreTransaction>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Rollback failed after {}: {}", err, rollback_err);
            }
            Err(err)
        }
    }
}
