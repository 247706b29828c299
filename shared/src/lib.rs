//! Shared types and models for the Agrivet purchasing platform
//!
//! This crate contains the purchase order and inventory models together with
//! the pure calculations (order totals, receipt thresholds) used by the backend
//! and any other client of the purchasing API.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
