//! # Domain Types
//!
//! Core domain types used throughout Rebill.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │     Product     │   │  InventoryItem  │       │
//! │  │  ─────────────  │ 1 │  ─────────────  │ 1 │  ─────────────  │       │
//! │  │  id             │──►│  product_id     │──►│  id             │       │
//! │  │  name (unique)  │ * │  name, price    │0..1  stock         │       │
//! │  │  active         │   │  category_id    │   │  alert_threshold│       │
//! │  └─────────────────┘   │  active         │   │  product_id     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │    BillItem     │   │    Setting      │       │
//! │  │  ─────────────  │ 1 │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, bill_no    │──►│  product_id     │   │  key → value    │       │
//! │  │  status         │ * │  name (frozen)  │   │  group_name     │       │
//! │  │  total_amount   │   │  price (frozen) │   └─────────────────┘       │
//! │  └─────────────────┘   │  quantity       │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timestamps are local wall-clock time without an offset. Bill numbers are
//! scoped by the local calendar day, so the stored value is what the shop
//! clock said.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Stable external key, immutable once created.
    pub product_id: String,

    /// Display name, copied into bills at sale time.
    pub name: String,

    /// Current selling price (> 0).
    pub price: f64,

    /// Owning category.
    pub category_id: Option<i64>,

    /// Free-text category label kept for rows that predate category ids.
    pub category: Option<String>,

    /// Opaque reference into the image store.
    pub image_filename: Option<String>,

    /// Inactive products are hidden from default listings and cannot be billed.
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: NaiveDateTime,

    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    /// Category name, resolved case-insensitively.
    pub category: Option<String>,
    pub image_filename: Option<String>,
}

/// Partial update for a product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub image_filename: Option<String>,
    pub active: Option<bool>,
}

/// How `delete_product` treats the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductDeleteMode {
    /// Mark the product inactive and keep the row.
    #[default]
    Soft,
    /// Remove the row; linked inventory is unlinked.
    Hard,
}

impl FromStr for ProductDeleteMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(ProductDeleteMode::Soft),
            "hard" => Ok(ProductDeleteMode::Hard),
            _ => Err(ValidationError::NotAllowed {
                field: "delete_mode".to_string(),
                allowed: vec!["soft".to_string(), "hard".to_string()],
            }),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    /// Unique, compared case-insensitively.
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update for a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Answer of the category usage check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryUsage {
    pub used: bool,
    pub reason: String,
}

/// What `delete_category` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CategoryDeletion {
    /// Unused category, row removed.
    Removed,
    /// Used category, marked inactive instead.
    Deactivated { reason: String },
}

// =============================================================================
// Inventory
// =============================================================================

/// What an inventory row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryType {
    /// Sold as-is, usually linked 1:1 to a product.
    DirectSale,
    /// Ingredient or supply, never sold directly.
    RawMaterial,
}

impl FromStr for InventoryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT_SALE" => Ok(InventoryType::DirectSale),
            "RAW_MATERIAL" => Ok(InventoryType::RawMaterial),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["DIRECT_SALE".to_string(), "RAW_MATERIAL".to_string()],
            }),
        }
    }
}

/// Stock classification derived from `stock` and `alert_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    /// `stock <= 0` is out, `stock <= threshold` is low, anything else is in stock.
    pub fn classify(stock: f64, alert_threshold: f64) -> Self {
        if stock <= 0.0 {
            StockStatus::OutOfStock
        } else if stock <= alert_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor for the high-water mark of a new inventory row.
pub const MIN_STOCK_HISTORY: f64 = 10.0;

/// A stock-tracking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub item_type: InventoryType,
    pub unit: String,
    /// May go negative when oversold.
    pub stock: f64,
    pub unit_price: f64,
    pub alert_threshold: f64,
    /// Highest stock ever recorded, never decreases.
    pub max_stock_history: f64,
    pub product_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
}

impl InventoryItem {
    /// Current stock classification.
    pub fn status(&self) -> StockStatus {
        StockStatus::classify(self.stock, self.alert_threshold)
    }

    /// A direct-sale row linked to an inactive product is read-only.
    ///
    /// `product_active` is the linked product's flag, `None` when the row is
    /// unlinked or the product row is gone.
    pub fn is_locked(&self, product_active: Option<bool>) -> bool {
        self.item_type == InventoryType::DirectSale
            && self.product_id.is_some()
            && product_active == Some(false)
    }
}

/// High-water mark after stock moves to `new_stock`.
pub fn next_stock_history(current_max: f64, new_stock: f64) -> f64 {
    current_max.max(new_stock)
}

/// Inventory row as shown to callers, with derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub status: StockStatus,
    pub is_locked: bool,
}

impl InventoryView {
    pub fn new(item: InventoryItem, product_active: Option<bool>) -> Self {
        let status = item.status();
        let is_locked = item.is_locked(product_active);
        InventoryView {
            item,
            status,
            is_locked,
        }
    }
}

/// Input for creating an inventory row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: InventoryType,
    pub unit: String,
    #[serde(default)]
    pub stock: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub alert_threshold: f64,
    pub product_id: Option<String>,
}

/// Partial update for an inventory row's details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<InventoryType>,
    pub unit: Option<String>,
    pub stock: Option<f64>,
    pub unit_price: Option<f64>,
    pub alert_threshold: Option<f64>,
}

// =============================================================================
// Bill Status
// =============================================================================

/// The status of a bill. `Confirmed → Cancelled` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Confirmed,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Confirmed => "CONFIRMED",
            BillStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for BillStatus {
    type Err = ValidationError;

    /// Stored values may carry stray whitespace or lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Ok(BillStatus::Confirmed),
            "CANCELLED" => Ok(BillStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["CONFIRMED".to_string(), "CANCELLED".to_string()],
            }),
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "UPI" => Ok(PaymentMethod::Upi),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["CASH".to_string(), "CARD".to_string(), "UPI".to_string()],
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A line item frozen at bill time.
///
/// Never re-derived from the live product row: a later rename or reprice
/// leaves historical bills untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillItem {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    /// Unit price at time of sale (frozen).
    pub price: f64,
    pub quantity: i64,
}

impl BillItem {
    /// `price × quantity`
    #[inline]
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// A finalized sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Bill {
    pub id: i64,
    /// Unique only within its numbering scope (one day, or global).
    pub bill_no: i64,
    pub customer_name: Option<String>,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: BillStatus,
    /// Ordered as entered.
    pub items: Vec<BillItem>,
    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
}

impl Bill {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == BillStatus::Cancelled
    }
}

// =============================================================================
// Settings
// =============================================================================

/// A stored setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub group_name: String,
    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
}

/// One entry of a bulk settings upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    /// Defaults to `app`.
    pub group_name: Option<String>,
}

impl SettingEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SettingEntry {
            key: key.into(),
            value: value.into(),
            group_name: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
