//! Validation and calculation rules for purchase orders
//!
//! Everything in here is pure so it can be shared by the backend and any
//! client that wants to preview order totals before submitting.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{OrderTotals, PurchaseOrderItem};

/// Purchase tax rate applied to every order subtotal (12%)
pub const TAX_RATE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);

/// Monetary amounts are kept to two decimal places
pub const MONEY_SCALE: u32 = 2;

/// Unit costs are stored as NUMERIC(14, 4)
pub const UNIT_COST_SCALE: u32 = 4;

/// Exclusive upper bound for a unit cost (ten integer digits)
pub const MAX_UNIT_COST: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

// ============================================================================
// Line Items & Totals
// ============================================================================

/// Validate a single line item before it is priced
pub fn validate_line_item(quantity_ordered: i32, unit_cost: Decimal) -> Result<(), &'static str> {
    if quantity_ordered <= 0 {
        return Err("Quantity ordered must be positive");
    }
    if unit_cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    if unit_cost >= MAX_UNIT_COST {
        return Err("Unit cost is too large");
    }
    if unit_cost.normalize().scale() > UNIT_COST_SCALE {
        return Err("Unit cost cannot have more than 4 decimal places");
    }
    Ok(())
}

/// Line total = quantity ordered x unit cost
pub fn compute_line_total(quantity_ordered: i32, unit_cost: Decimal) -> Decimal {
    Decimal::from(quantity_ordered) * unit_cost
}

/// Round a monetary amount half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute subtotal, tax and total from line totals
pub fn compute_order_totals<I>(line_totals: I) -> OrderTotals
where
    I: IntoIterator<Item = Decimal>,
{
    let subtotal: Decimal = line_totals.into_iter().sum();
    let tax_amount = round_money(subtotal * TAX_RATE);
    OrderTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal + tax_amount,
    }
}

// ============================================================================
// Receiving
// ============================================================================

/// Validate a quantity being booked in against a line item
pub fn validate_receipt_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity received must be positive");
    }
    Ok(())
}

/// True when every item has been received in full.
///
/// An order without items is never considered received.
pub fn all_items_received(items: &[PurchaseOrderItem]) -> bool {
    !items.is_empty() && items.iter().all(PurchaseOrderItem::is_fully_received)
}
