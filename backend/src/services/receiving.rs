//! Receipt tracking for purchase order line items

use chrono::NaiveDate;
use shared::models::PurchaseOrderItem;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::StoreTransaction;

/// Result of booking a quantity in against one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptOutcome {
    /// Cumulative quantity received after this receipt
    pub new_total: i32,
    pub is_fully_received: bool,
}

impl ReceiptOutcome {
    /// Units booked in beyond the ordered quantity
    pub fn over_receipt(&self, item: &PurchaseOrderItem) -> i32 {
        (self.new_total - item.quantity_ordered).max(0)
    }
}

/// Add `incoming` to the item's received total.
///
/// The total is not clamped to the ordered quantity: an over-shipment is
/// recorded as received. A total that no longer fits the column is rejected.
pub fn record_receipt(item: &PurchaseOrderItem, incoming: i32) -> AppResult<ReceiptOutcome> {
    let new_total = item.quantity_received.checked_add(incoming).ok_or_else(|| {
        AppError::validation(
            "quantity_received",
            "Received total exceeds the largest quantity that can be stored",
        )
    })?;
    Ok(ReceiptOutcome {
        new_total,
        is_fully_received: new_total >= item.quantity_ordered,
    })
}

/// Write the new received total and date back to the item
pub async fn persist_receipt(
    tx: &mut dyn StoreTransaction,
    item_id: Uuid,
    outcome: &ReceiptOutcome,
    received_date: NaiveDate,
) -> AppResult<PurchaseOrderItem> {
    tx.update_item_receipt(item_id, outcome.new_total, received_date)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order item".to_string()))
}
