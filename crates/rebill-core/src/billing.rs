//! # Billing Rules
//!
//! Pure parts of bill creation: request validation, line snapshots, totals
//! and the numbering scope. The database layer wraps these in a single
//! transaction.
//!
//! ## Bill Creation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewBill { items: [(product_id, qty, unit_price?)] }                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_lines()          ◄── here: non-empty, qty > 0, price > 0     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve products          ◄── rebill-db (active products only)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshot_line() × N       ◄── here: name now, price now              │
//! │  bill_total()              ◄── here: Σ price × qty                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────── one transaction (rebill-db) ─────────────────┐      │
//! │  │ INSERT bill with MAX(bill_no)+1 in NumberingScope            │      │
//! │  │ INSERT items in order                                        │      │
//! │  │ deduct linked inventory                                      │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{BillItem, PaymentMethod, Product};
use crate::validation::{validate_price, validate_product_id, validate_quantity};

/// How many times bill creation recomputes its number after a collision.
pub const BILL_NUMBER_ATTEMPTS: u32 = 5;

// =============================================================================
// Requests
// =============================================================================

/// One requested line of a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLineRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Caller-supplied unit price; the catalog price is used when absent.
    pub unit_price: Option<f64>,
}

impl BillLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        BillLineRequest {
            product_id: product_id.into(),
            quantity,
            unit_price: None,
        }
    }
}

/// Input for `create_bill`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBill {
    pub customer_name: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub items: Vec<BillLineRequest>,
}

impl NewBill {
    /// Cash bill without a customer name.
    pub fn cash(items: Vec<BillLineRequest>) -> Self {
        NewBill {
            customer_name: None,
            payment_method: PaymentMethod::Cash,
            items,
        }
    }
}

/// Input for `update_bill`. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillUpdate {
    pub customer_name: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub items: Vec<BillLineRequest>,
}

// =============================================================================
// Validation & Snapshots
// =============================================================================

/// Rejects empty bills, non-positive quantities and non-positive prices.
///
/// Runs before any product lookup so a malformed request never touches
/// the database.
pub fn validate_lines(lines: &[BillLineRequest]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyBill);
    }

    for line in lines {
        validate_product_id(&line.product_id)?;
        validate_quantity(line.quantity)?;
        if let Some(price) = line.unit_price {
            validate_price(price)?;
        }
    }

    Ok(())
}

/// Freezes a product into a bill line.
///
/// The name always comes from the product as it is now. The price is the
/// caller's unit price when one was given, else the current catalog price.
pub fn snapshot_line(product: &Product, line: &BillLineRequest) -> BillItem {
    BillItem {
        product_id: product.product_id.clone(),
        name: product.name.clone(),
        price: line.unit_price.unwrap_or(product.price),
        quantity: line.quantity,
    }
}

/// Sum of line totals.
pub fn bill_total(items: &[BillItem]) -> f64 {
    items.iter().map(BillItem::line_total).sum()
}

// =============================================================================
// Numbering
// =============================================================================

/// Which bills compete for the next number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingScope {
    /// Bills created on this local calendar day.
    Daily(NaiveDate),
    /// Every bill ever stored.
    Global,
}

impl NumberingScope {
    /// Scope for the `bill_reset_daily` policy on `today`.
    pub fn for_policy(reset_daily: bool, today: NaiveDate) -> Self {
        if reset_daily {
            NumberingScope::Daily(today)
        } else {
            NumberingScope::Global
        }
    }

    /// The day restricting the scope, if any.
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            NumberingScope::Daily(day) => Some(*day),
            NumberingScope::Global => None,
        }
    }
}

/// Next number after the highest one in scope; 1 for an empty scope.
pub fn next_bill_number(current_max: Option<i64>) -> i64 {
    current_max.unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::NaiveDate;

    fn product(id: &str, name: &str, price: f64) -> Product {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Product {
            product_id: id.to_string(),
            name: name.to_string(),
            price,
            category_id: None,
            category: None,
            image_filename: None,
            active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_empty_bill_rejected() {
        assert!(matches!(validate_lines(&[]), Err(CoreError::EmptyBill)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let lines = vec![BillLineRequest::new("A1", 2), BillLineRequest::new("B2", 0)];
        assert!(matches!(
            validate_lines(&lines),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let mut line = BillLineRequest::new("A1", 1);
        line.unit_price = Some(-1.0);
        assert!(validate_lines(&[line]).is_err());
    }

    #[test]
    fn test_snapshot_prefers_caller_price_but_not_caller_name() {
        let p = product("A1", "Masala Soda", 25.0);

        let plain = snapshot_line(&p, &BillLineRequest::new("A1", 2));
        assert_eq!(plain.price, 25.0);
        assert_eq!(plain.name, "Masala Soda");

        let mut custom = BillLineRequest::new("A1", 2);
        custom.unit_price = Some(22.5);
        let snap = snapshot_line(&p, &custom);
        assert_eq!(snap.price, 22.5);
        assert_eq!(snap.line_total(), 45.0);
    }

    #[test]
    fn test_bill_total() {
        let p = product("A1", "Cola", 25.0);
        let q = product("B2", "Paan", 10.0);
        let items = vec![
            snapshot_line(&p, &BillLineRequest::new("A1", 2)),
            snapshot_line(&q, &BillLineRequest::new("B2", 3)),
        ];
        assert_eq!(bill_total(&items), 80.0);
    }

    #[test]
    fn test_numbering() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(NumberingScope::for_policy(true, day).day(), Some(day));
        assert_eq!(NumberingScope::for_policy(false, day), NumberingScope::Global);
        assert_eq!(next_bill_number(None), 1);
        assert_eq!(next_bill_number(Some(41)), 42);
    }
}
