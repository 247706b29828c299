//! PostgreSQL store backed by sqlx

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::models::{
    InventoryMovement, MovementDirection, MovementReference, Product, PurchaseOrder,
    PurchaseOrderFilter, PurchaseOrderItem, PurchaseOrderPatch, PurchaseOrderStatus,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{DataStore, StoreError, StoreResult, StoreTransaction};
use crate::config::DatabaseConfig;

// SQLSTATE for integer overflow
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// [`DataStore`] over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            StoreError::Unavailable("database.url is not configured".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    supplier_id: Uuid,
    status: String,
    order_date: NaiveDate,
    expected_delivery_date: Option<NaiveDate>,
    actual_delivery_date: Option<NaiveDate>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    notes: Option<String>,
    created_by: Option<Uuid>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for PurchaseOrder {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = PurchaseOrderStatus::from_str(&row.status).ok_or(StoreError::Decode {
            column: "purchase_orders.status",
            value: row.status.clone(),
        })?;

        Ok(PurchaseOrder {
            id: row.id,
            supplier_id: row.supplier_id,
            status,
            order_date: row.order_date,
            expected_delivery_date: row.expected_delivery_date,
            actual_delivery_date: row.actual_delivery_date,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            notes: row.notes,
            created_by: row.created_by,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    purchase_order_id: Uuid,
    product_id: Uuid,
    quantity_ordered: i32,
    quantity_received: i32,
    unit_cost: Decimal,
    line_total: Decimal,
    received_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for PurchaseOrderItem {
    fn from(row: ItemRow) -> Self {
        PurchaseOrderItem {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            product_id: row.product_id,
            quantity_ordered: row.quantity_ordered,
            quantity_received: row.quantity_received,
            unit_cost: row.unit_cost,
            line_total: row.line_total,
            received_date: row.received_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    stock_quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            stock_quantity: row.stock_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    direction: String,
    quantity: i32,
    reference_type: String,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let direction = MovementDirection::from_str(&row.direction).ok_or(StoreError::Decode {
            column: "inventory_movements.direction",
            value: row.direction.clone(),
        })?;
        let reference_type =
            MovementReference::from_str(&row.reference_type).ok_or(StoreError::Decode {
                column: "inventory_movements.reference_type",
                value: row.reference_type.clone(),
            })?;

        Ok(InventoryMovement {
            id: row.id,
            product_id: row.product_id,
            direction,
            quantity: row.quantity,
            reference_type,
            reference_id: row.reference_id,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Queries
// ============================================================================

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, supplier_id, status, order_date, expected_delivery_date,
                   actual_delivery_date, subtotal, tax_amount, total_amount, notes,
                   created_by, approved_by, approved_at, created_at, updated_at
            FROM purchase_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PurchaseOrder::try_from).transpose()
    }

    async fn list_orders(&mut self, filter: &PurchaseOrderFilter) -> StoreResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, supplier_id, status, order_date, expected_delivery_date,
                   actual_delivery_date, subtotal, tax_amount, total_amount, notes,
                   created_by, approved_by, approved_at, created_at, updated_at
            FROM purchase_orders
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR supplier_id = $2)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.supplier_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(PurchaseOrder::try_from).collect()
    }

    async fn insert_order(&mut self, order: &PurchaseOrder) -> StoreResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO purchase_orders (
                id, supplier_id, status, order_date, expected_delivery_date,
                actual_delivery_date, subtotal, tax_amount, total_amount, notes,
                created_by, approved_by, approved_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, supplier_id, status, order_date, expected_delivery_date,
                      actual_delivery_date, subtotal, tax_amount, total_amount, notes,
                      created_by, approved_by, approved_at, created_at, updated_at
            "#,
        )
        .bind(order.id)
        .bind(order.supplier_id)
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(order.expected_delivery_date)
        .bind(order.actual_delivery_date)
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.total_amount)
        .bind(&order.notes)
        .bind(order.created_by)
        .bind(order.approved_by)
        .bind(order.approved_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn update_order(
        &mut self,
        id: Uuid,
        patch: &PurchaseOrderPatch,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE purchase_orders
            SET status = COALESCE($2, status),
                approved_by = COALESCE($3, approved_by),
                approved_at = COALESCE($4, approved_at),
                actual_delivery_date = COALESCE($5, actual_delivery_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, supplier_id, status, order_date, expected_delivery_date,
                      actual_delivery_date, subtotal, tax_amount, total_amount, notes,
                      created_by, approved_by, approved_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.approved_by)
        .bind(patch.approved_at)
        .bind(patch.actual_delivery_date)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PurchaseOrder::try_from).transpose()
    }

    async fn find_item(&mut self, id: Uuid) -> StoreResult<Option<PurchaseOrderItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, purchase_order_id, product_id, quantity_ordered, quantity_received,
                   unit_cost, line_total, received_date, created_at, updated_at
            FROM purchase_order_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_items_by_order(&mut self, order_id: Uuid) -> StoreResult<Vec<PurchaseOrderItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, purchase_order_id, product_id, quantity_ordered, quantity_received,
                   unit_cost, line_total, received_date, created_at, updated_at
            FROM purchase_order_items
            WHERE purchase_order_id = $1
            ORDER BY line_number
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<PurchaseOrderItem> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO purchase_order_items (
                id, purchase_order_id, product_id, quantity_ordered, quantity_received,
                unit_cost, line_total, received_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, purchase_order_id, product_id, quantity_ordered, quantity_received,
                      unit_cost, line_total, received_date, created_at, updated_at
            "#,
        )
        .bind(item.id)
        .bind(item.purchase_order_id)
        .bind(item.product_id)
        .bind(item.quantity_ordered)
        .bind(item.quantity_received)
        .bind(item.unit_cost)
        .bind(item.line_total)
        .bind(item.received_date)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn update_item_receipt(
        &mut self,
        id: Uuid,
        quantity_received: i32,
        received_date: NaiveDate,
    ) -> StoreResult<Option<PurchaseOrderItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            UPDATE purchase_order_items
            SET quantity_received = $2, received_date = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, purchase_order_id, product_id, quantity_ordered, quantity_received,
                      unit_cost, line_total, received_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(quantity_received)
        .bind(received_date)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, sku, name, stock_quantity, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn increment_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| {
            let overflow = matches!(
                &err,
                sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
            );
            if overflow {
                StoreError::OutOfRange {
                    column: "products.stock_quantity",
                }
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(quantity)
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<InventoryMovement> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, direction, quantity, reference_type, reference_id, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, product_id, direction, quantity, reference_type, reference_id,
                      notes, created_at
            "#,
        )
        .bind(movement.id)
        .bind(movement.product_id)
        .bind(movement.direction.as_str())
        .bind(movement.quantity)
        .bind(movement.reference_type.as_str())
        .bind(movement.reference_id)
        .bind(&movement.notes)
        .bind(movement.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn list_movements(&mut self, product_id: Uuid) -> StoreResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, direction, quantity, reference_type, reference_id,
                   notes, created_at
            FROM inventory_movements
            WHERE product_id = $1
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
