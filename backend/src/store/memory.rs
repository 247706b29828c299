//! In-memory store used for local development and tests
//!
//! A transaction takes the table lock for its whole lifetime and works on a
//! copy of the tables, so concurrent operations are serialized and a rollback
//! simply drops the copy.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use shared::models::{
    InventoryMovement, Product, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderItem,
    PurchaseOrderPatch,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{DataStore, StoreError, StoreResult, StoreTransaction};

/// Write operations that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    InsertOrder,
    UpdateOrder,
    InsertItem,
    UpdateItem,
    IncrementStock,
    InsertMovement,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<Uuid, PurchaseOrder>,
    // insertion order is the line order of a purchase order
    items: Vec<PurchaseOrderItem>,
    products: HashMap<Uuid, Product>,
    movements: Vec<InventoryMovement>,
}

type Failpoints = Arc<std::sync::Mutex<HashSet<StoreOperation>>>;

/// Process-local [`DataStore`]
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    failpoints: Failpoints,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product with an opening stock level
    pub async fn insert_product(&self, sku: &str, name: &str, stock_quantity: i32) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            sku: sku.to_string(),
            name: name.to_string(),
            stock_quantity,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }

    /// Make every subsequent `op` fail until [`clear_failures`](Self::clear_failures)
    pub fn fail_on(&self, op: StoreOperation) {
        self.failpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(op);
    }

    pub fn clear_failures(&self) {
        self.failpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Committed state of a product
    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    /// Committed state of a line item
    pub async fn item(&self, id: Uuid) -> Option<PurchaseOrderItem> {
        self.tables
            .lock()
            .await
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Committed state of an order
    pub async fn order(&self, id: Uuid) -> Option<PurchaseOrder> {
        self.tables.lock().await.orders.get(&id).cloned()
    }

    /// All committed movements in the order they were written
    pub async fn movements(&self) -> Vec<InventoryMovement> {
        self.tables.lock().await.movements.clone()
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            failpoints: self.failpoints.clone(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    failpoints: Failpoints,
}

impl InMemoryTransaction {
    fn check(&self, op: StoreOperation) -> StoreResult<()> {
        let armed = self
            .failpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&op);
        if armed {
            return Err(StoreError::Unavailable(format!(
                "injected failure on {:?}",
                op
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders(&mut self, filter: &PurchaseOrderFilter) -> StoreResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self
            .working
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<PurchaseOrder> {
        self.check(StoreOperation::InsertOrder)?;
        self.working.orders.insert(order.id, order.clone());
        Ok(order.clone())
    }

    async fn update_order(
        &mut self,
        id: Uuid,
        patch: &PurchaseOrderPatch,
    ) -> StoreResult<Option<PurchaseOrder>> {
        self.check(StoreOperation::UpdateOrder)?;
        let Some(order) = self.working.orders.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(approved_by) = patch.approved_by {
            order.approved_by = Some(approved_by);
        }
        if let Some(approved_at) = patch.approved_at {
            order.approved_at = Some(approved_at);
        }
        if let Some(date) = patch.actual_delivery_date {
            order.actual_delivery_date = Some(date);
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn find_item(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrderItem>> {
        Ok(self.working.items.iter().find(|i| i.id == id).cloned())
    }

    async fn find_items_by_order(&mut self, order_id: Uuid) -> StoreResult<Vec<PurchaseOrderItem>> {
        Ok(self
            .working
            .items
            .iter()
            .filter(|i| i.purchase_order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<PurchaseOrderItem> {
        self.check(StoreOperation::InsertItem)?;
        self.working.items.push(item.clone());
        Ok(item.clone())
    }

    async fn update_item_receipt(
        &mut self,
        id: Uuid,
        quantity_received: i32,
        received_date: NaiveDate,
    ) -> StoreResult<Option<PurchaseOrderItem>> {
        self.check(StoreOperation::UpdateItem)?;
        let Some(item) = self.working.items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        item.quantity_received = quantity_received;
        item.received_date = Some(received_date);
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn increment_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<Option<i32>> {
        self.check(StoreOperation::IncrementStock)?;
        let Some(product) = self.working.products.get_mut(&product_id) else {
            return Ok(None);
        };
        product.stock_quantity = product
            .stock_quantity
            .checked_add(delta)
            .ok_or(StoreError::OutOfRange {
                column: "products.stock_quantity",
            })?;
        product.updated_at = Utc::now();
        Ok(Some(product.stock_quantity))
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<InventoryMovement> {
        self.check(StoreOperation::InsertMovement)?;
        self.working.movements.push(movement.clone());
        Ok(movement.clone())
    }

    async fn list_movements(&mut self, product_id: Uuid) -> StoreResult<Vec<InventoryMovement>> {
        Ok(self
            .working
            .movements
            .iter()
            .rev()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check(StoreOperation::Commit)?;
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
