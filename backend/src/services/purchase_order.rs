//! Purchase order service: creation, approval, cancellation and receiving
//!
//! Each public operation runs in a single store transaction. In particular a
//! receipt updates the line item, the product stock and (when the last item
//! completes) the order status atomically.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    MovementDirection, MovementReference, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderItem,
    PurchaseOrderPatch, PurchaseOrderStatus, PurchaseOrderWithItems,
};
use shared::validation::{
    compute_line_total, compute_order_totals, validate_line_item, validate_receipt_quantity,
};
use tracing::instrument;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::finish;
use super::ledger::{self, StockDelta};
use super::receiving;
use super::reconciler::{self, ReconcileOutcome};
use crate::error::{AppError, AppResult};
use crate::store::{DataStore, StoreTransaction};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn DataStore>,
}

/// Input for creating a purchase order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    /// Defaults to today
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<LineItemInput>,
}

/// One line of a new purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: Uuid,
    pub quantity_ordered: i32,
    pub unit_cost: Decimal,
}

/// Input for approving a purchase order
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveOrderInput {
    pub approved_by: Uuid,
}

/// Input for booking goods in against a line item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiveItemInput {
    #[validate(custom = "receipt_quantity")]
    pub quantity_received: i32,
    /// Defaults to today
    pub received_date: Option<NaiveDate>,
}

fn receipt_quantity(quantity: i32) -> Result<(), ValidationError> {
    validate_receipt_quantity(quantity).map_err(|msg| {
        let mut err = ValidationError::new("range");
        err.message = Some(msg.into());
        err
    })
}

/// Outcome of a receipt
#[derive(Debug, Clone, Serialize)]
pub struct ItemReceipt {
    pub item: PurchaseOrderItem,
    pub is_fully_received: bool,
    /// Product stock level after the receipt
    pub stock_quantity: i32,
    pub order_status: PurchaseOrderStatus,
}

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Create a draft purchase order with its line items and derived totals
    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, lines = input.items.len()))]
    pub async fn create_order(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderWithItems> {
        input.validate()?;

        for (index, line) in input.items.iter().enumerate() {
            validate_line_item(line.quantity_ordered, line.unit_cost)
                .map_err(|msg| AppError::validation(format!("items[{}]", index), msg))?;
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let items: Vec<PurchaseOrderItem> = input
            .items
            .iter()
            .map(|line| PurchaseOrderItem {
                id: Uuid::new_v4(),
                purchase_order_id: order_id,
                product_id: line.product_id,
                quantity_ordered: line.quantity_ordered,
                quantity_received: 0,
                unit_cost: line.unit_cost,
                line_total: compute_line_total(line.quantity_ordered, line.unit_cost),
                received_date: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let totals = compute_order_totals(items.iter().map(|i| i.line_total));

        let order = PurchaseOrder {
            id: order_id,
            supplier_id: input.supplier_id,
            status: PurchaseOrderStatus::Draft,
            order_date: input.order_date.unwrap_or_else(|| now.date_naive()),
            expected_delivery_date: input.expected_delivery_date,
            actual_delivery_date: None,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            notes: input.notes,
            created_by: input.created_by,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        let result = insert_order_with_items(tx.as_mut(), order, items).await;
        let created = finish(tx, result).await?;

        tracing::info!(
            order_id = %created.order.id,
            total_amount = %created.order.total_amount,
            "Purchase order created"
        );
        Ok(created)
    }

    /// Get a purchase order with its items
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderWithItems> {
        let mut tx = self.store.begin().await?;
        let result: AppResult<PurchaseOrderWithItems> = async {
            let order = find_order(tx.as_mut(), order_id).await?;
            let items = tx.find_items_by_order(order_id).await?;
            Ok(PurchaseOrderWithItems { order, items })
        }
        .await;
        finish(tx, result).await
    }

    /// List purchase orders, newest first
    pub async fn list_orders(&self, filter: PurchaseOrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_orders(&filter).await.map_err(AppError::from);
        finish(tx, result).await
    }

    /// Approve an order: `confirmed` with the approver recorded.
    ///
    /// Re-approval rewrites the same fields. Cancelled orders cannot be approved.
    #[instrument(skip(self))]
    pub async fn approve_order(
        &self,
        order_id: Uuid,
        input: ApproveOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let result: AppResult<PurchaseOrder> = async {
            let order = find_order(tx.as_mut(), order_id).await?;
            if order.status == PurchaseOrderStatus::Cancelled {
                return Err(AppError::InvalidStateTransition(
                    "A cancelled purchase order cannot be approved".to_string(),
                ));
            }

            let patch = PurchaseOrderPatch {
                status: Some(PurchaseOrderStatus::Confirmed),
                approved_by: Some(input.approved_by),
                approved_at: Some(Utc::now()),
                ..Default::default()
            };
            tx.update_order(order_id, &patch)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
        }
        .await;
        let order = finish(tx, result).await?;

        tracing::info!(approved_by = %input.approved_by, "Purchase order approved");
        Ok(order)
    }

    /// Cancel an order that has not been fully received. Cancelling twice is a no-op.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let result: AppResult<PurchaseOrder> = async {
            let order = find_order(tx.as_mut(), order_id).await?;
            match order.status {
                PurchaseOrderStatus::Cancelled => Ok(order),
                PurchaseOrderStatus::Received => Err(AppError::InvalidStateTransition(
                    "A received purchase order cannot be cancelled".to_string(),
                )),
                PurchaseOrderStatus::Draft | PurchaseOrderStatus::Confirmed => {
                    let patch = PurchaseOrderPatch {
                        status: Some(PurchaseOrderStatus::Cancelled),
                        ..Default::default()
                    };
                    tx.update_order(order_id, &patch)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
                }
            }
        }
        .await;
        let order = finish(tx, result).await?;

        tracing::info!(status = order.status.as_str(), "Purchase order cancel requested");
        Ok(order)
    }

    /// Book goods in against a line item.
    ///
    /// Updates the item's received total, adds the quantity to product stock
    /// and, if the item is now complete, re-checks the order status.
    #[instrument(skip(self))]
    pub async fn receive_item(&self, item_id: Uuid, input: ReceiveItemInput) -> AppResult<ItemReceipt> {
        input.validate()?;

        let today = Utc::now().date_naive();
        let received_date = input.received_date.unwrap_or(today);

        let mut tx = self.store.begin().await?;
        let result = receive_in(
            tx.as_mut(),
            item_id,
            input.quantity_received,
            received_date,
            today,
        )
        .await;
        let receipt = finish(tx, result).await?;

        tracing::info!(
            quantity = input.quantity_received,
            quantity_received = receipt.item.quantity_received,
            fully_received = receipt.is_fully_received,
            order_status = receipt.order_status.as_str(),
            "Purchase order item received"
        );
        Ok(receipt)
    }

    /// Re-derive an order's status from its items
    #[instrument(skip(self))]
    pub async fn reconcile_order(&self, order_id: Uuid) -> AppResult<ReconcileOutcome> {
        let today = Utc::now().date_naive();
        let mut tx = self.store.begin().await?;
        let result = reconciler::check_order(tx.as_mut(), order_id, today).await;
        finish(tx, result).await
    }
}

async fn find_order(tx: &mut dyn StoreTransaction, order_id: Uuid) -> AppResult<PurchaseOrder> {
    tx.find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
}

async fn insert_order_with_items(
    tx: &mut dyn StoreTransaction,
    order: PurchaseOrder,
    items: Vec<PurchaseOrderItem>,
) -> AppResult<PurchaseOrderWithItems> {
    for (index, item) in items.iter().enumerate() {
        if tx.find_product(item.product_id).await?.is_none() {
            return Err(AppError::validation(
                format!("items[{}].product_id", index),
                format!("Unknown product {}", item.product_id),
            ));
        }
    }

    let order = tx.insert_order(&order).await?;

    let mut saved = Vec::with_capacity(items.len());
    for item in &items {
        saved.push(tx.insert_item(item).await?);
    }

    Ok(PurchaseOrderWithItems {
        order,
        items: saved,
    })
}

async fn receive_in(
    tx: &mut dyn StoreTransaction,
    item_id: Uuid,
    quantity: i32,
    received_date: NaiveDate,
    today: NaiveDate,
) -> AppResult<ItemReceipt> {
    let item = tx
        .find_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order item".to_string()))?;

    let order = find_order(tx, item.purchase_order_id).await?;
    if !order.status.accepts_receipts() {
        return Err(AppError::InvalidStateTransition(format!(
            "Purchase order {} is {} and cannot receive goods",
            order.id, order.status
        )));
    }

    let outcome = receiving::record_receipt(&item, quantity)?;
    let over = outcome.over_receipt(&item);
    if over > 0 {
        tracing::warn!(
            item_id = %item.id,
            quantity_ordered = item.quantity_ordered,
            over_receipt = over,
            "Received more than ordered"
        );
    }

    let item = receiving::persist_receipt(tx, item.id, &outcome, received_date).await?;

    let stock_quantity = ledger::apply_delta(
        tx,
        StockDelta {
            product_id: item.product_id,
            quantity,
            direction: MovementDirection::In,
            reference: MovementReference::PurchaseOrder,
            reference_id: Some(order.id),
            notes: Some(format!("Received against purchase order {}", order.id)),
        },
    )
    .await?;

    let order_status = if outcome.is_fully_received {
        reconciler::check_order(tx, order.id, today).await?.status
    } else {
        order.status
    };

    Ok(ItemReceipt {
        item,
        is_fully_received: outcome.is_fully_received,
        stock_quantity,
        order_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_input_validation() {
        let input = ReceiveItemInput {
            quantity_received: 0,
            received_date: None,
        };
        let err: AppError = input.validate().unwrap_err().into();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "quantity_received");
                assert_eq!(message, "Quantity received must be positive");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let input = ReceiveItemInput {
            quantity_received: 3,
            received_date: None,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_create_input_requires_lines() {
        let mut input = CreatePurchaseOrderInput {
            supplier_id: Uuid::new_v4(),
            order_date: None,
            expected_delivery_date: None,
            notes: None,
            created_by: None,
            items: Vec::new(),
        };
        let err: AppError = input.validate().unwrap_err().into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items"));

        input.items.push(LineItemInput {
            product_id: Uuid::new_v4(),
            quantity_ordered: 1,
            unit_cost: Decimal::ONE,
        });
        assert!(input.validate().is_ok());
    }
}
