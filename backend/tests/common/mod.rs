//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use agrivet_purchasing::config::{
    Config, DatabaseConfig, LogConfig, ServerConfig, StorageBackend, StorageConfig,
};
use agrivet_purchasing::services::purchase_order::{
    ApproveOrderInput, CreatePurchaseOrderInput, LineItemInput, ReceiveItemInput,
};
use agrivet_purchasing::services::{InventoryService, PurchaseOrderService};
use agrivet_purchasing::store::{DataStore, InMemoryStore};
use agrivet_purchasing::AppState;
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct Fixture {
    pub store: InMemoryStore,
    pub orders: PurchaseOrderService,
    pub inventory: InventoryService,
}

pub fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let shared: Arc<dyn DataStore> = Arc::new(store.clone());
    Fixture {
        store,
        orders: PurchaseOrderService::new(shared.clone()),
        inventory: InventoryService::new(shared),
    }
}

pub fn line(product_id: Uuid, quantity_ordered: i32, unit_cost: &str) -> LineItemInput {
    LineItemInput {
        product_id,
        quantity_ordered,
        unit_cost: dec(unit_cost),
    }
}

pub fn order_input(items: Vec<LineItemInput>) -> CreatePurchaseOrderInput {
    CreatePurchaseOrderInput {
        supplier_id: Uuid::new_v4(),
        order_date: None,
        expected_delivery_date: None,
        notes: None,
        created_by: Some(Uuid::new_v4()),
        items,
    }
}

pub fn approval() -> ApproveOrderInput {
    ApproveOrderInput {
        approved_by: Uuid::new_v4(),
    }
}

pub fn receipt(quantity_received: i32) -> ReceiveItemInput {
    ReceiveItemInput {
        quantity_received,
        received_date: None,
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 1,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        log: LogConfig { json: false },
    }
}

pub fn app_state(store: &InMemoryStore) -> AppState {
    AppState {
        store: Arc::new(store.clone()),
        config: Arc::new(test_config()),
    }
}
