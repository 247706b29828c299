//! HTTP handlers for the Agrivet purchasing API

pub mod health;
pub mod inventory;
pub mod purchase_orders;

pub use health::*;
pub use inventory::*;
pub use purchase_orders::*;
