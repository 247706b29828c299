//! Order-level status reconciliation
//!
//! An order moves to `received` once every one of its line items has been
//! received in full.

use chrono::NaiveDate;
use shared::models::{PurchaseOrderPatch, PurchaseOrderStatus};
use shared::validation::all_items_received;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::StoreTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Order status after the check
    pub status: PurchaseOrderStatus,
    /// True only on the call that moved the order to `received`
    pub transitioned: bool,
}

/// Re-derive the order's status from its items.
///
/// Orders already `received` or `cancelled` are left untouched, which makes
/// repeated calls return the same status.
#[instrument(skip(tx))]
pub async fn check_order(
    tx: &mut dyn StoreTransaction,
    order_id: Uuid,
    today: NaiveDate,
) -> AppResult<ReconcileOutcome> {
    let order = tx
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

    let unchanged = ReconcileOutcome {
        status: order.status,
        transitioned: false,
    };

    if matches!(
        order.status,
        PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
    ) {
        return Ok(unchanged);
    }

    let items = tx.find_items_by_order(order_id).await?;
    if !all_items_received(&items) {
        return Ok(unchanged);
    }

    let patch = PurchaseOrderPatch {
        status: Some(PurchaseOrderStatus::Received),
        actual_delivery_date: Some(today),
        ..Default::default()
    };
    let updated = tx
        .update_order(order_id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

    tracing::info!(
        from = order.status.as_str(),
        items = items.len(),
        "Purchase order fully received"
    );

    Ok(ReconcileOutcome {
        status: updated.status,
        transitioned: true,
    })
}
