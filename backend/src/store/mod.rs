//! Persistence boundary for purchasing and stock data
//!
//! Services never talk to a database directly. They open a
//! [`StoreTransaction`] through a [`DataStore`], run every read and write of
//! one operation through it, and commit or roll back as a unit.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{
    InventoryMovement, Product, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderItem,
    PurchaseOrderPatch,
};
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::{InMemoryStore, StoreOperation};
pub use postgres::PgStore;

/// Failures raised by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{column} is out of range")]
    OutOfRange { column: &'static str },

    #[error("could not decode {column}: {value}")]
    Decode { column: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to a backing store
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Open a transaction. Nothing written through it is visible to others until commit.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Cheap connectivity check
    async fn ping(&self) -> StoreResult<()>;
}

/// Typed reads and writes over orders, items, products and movements
///
/// Lookups return `Ok(None)` for missing rows; mapping that to a not-found
/// error is up to the caller.
#[async_trait]
pub trait StoreTransaction: Send {
    // Purchase orders
    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrder>>;
    async fn list_orders(&mut self, filter: &PurchaseOrderFilter) -> StoreResult<Vec<PurchaseOrder>>;
    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<PurchaseOrder>;
    async fn update_order(
        &mut self,
        id: Uuid,
        patch: &PurchaseOrderPatch,
    ) -> StoreResult<Option<PurchaseOrder>>;

    // Purchase order items
    async fn find_item(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrderItem>>;
    async fn find_items_by_order(&mut self, order_id: Uuid) -> StoreResult<Vec<PurchaseOrderItem>>;
    async fn insert_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<PurchaseOrderItem>;
    async fn update_item_receipt(
        &mut self,
        id: Uuid,
        quantity_received: i32,
        received_date: NaiveDate,
    ) -> StoreResult<Option<PurchaseOrderItem>>;

    // Products and stock
    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;

    /// Add `delta` (may be negative) to the product's stock in one atomic
    /// statement and return the new level, or `None` if the product is missing.
    async fn increment_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<Option<i32>>;

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<InventoryMovement>;

    /// Movements for a product, newest first
    async fn list_movements(&mut self, product_id: Uuid) -> StoreResult<Vec<InventoryMovement>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
