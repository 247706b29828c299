//! Domain models for the Agrivet purchasing platform

mod inventory;
mod purchase_order;

pub use inventory::*;
pub use purchase_order::*;
