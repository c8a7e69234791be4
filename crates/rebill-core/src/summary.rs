//! # Sales Summaries
//!
//! Pure aggregation over bills that were already loaded. The database layer
//! decides which bills are in scope (confirmed only) and supplies the
//! category resolver; everything here is arithmetic.
//!
//! ## Category Resolution
//! Categories are looked up through the *current* catalog, not the bill
//! snapshot. Moving a product to another category therefore moves its
//! historical revenue in every later report.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::Bill;

/// Label used when a product no longer resolves to any category.
pub const UNKNOWN_CATEGORY: &str = "unknown";

// =============================================================================
// Date Windows
// =============================================================================

/// Inclusive range of local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("start {} is after end {}", start, end),
            }
            .into());
        }
        Ok(DateRange { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    /// Monday to Sunday week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        let start = date - Duration::days(offset);
        DateRange {
            start,
            end: start + Duration::days(6),
        }
    }

    /// Whole calendar month.
    pub fn month(year: i32, month: u32) -> CoreResult<Self> {
        let invalid = || ValidationError::InvalidFormat {
            field: "month".to_string(),
            reason: format!("{}-{:02} is not a calendar month", year, month),
        };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        Ok(DateRange {
            start,
            end: next - Duration::days(1),
        })
    }
}

// =============================================================================
// Summary Types
// =============================================================================

/// Totals for a set of bills.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub total_bills: i64,
    pub total_sales: f64,
    /// Revenue per category name.
    pub category_totals: BTreeMap<String, f64>,
    /// Revenue per `"HH:00"` bucket.
    pub hourly_sales: BTreeMap<String, f64>,
    /// `"HH:MM:SS"` of the earliest bill.
    pub first_bill_time: Option<String>,
    /// `"HH:MM:SS"` of the latest bill.
    pub last_bill_time: Option<String>,
    pub average_bill_value: f64,
    /// Earliest `"HH:00"` bucket holding the highest revenue.
    pub peak_hour: Option<String>,
}

/// One row of the best-seller list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub total_sales: f64,
}

/// Per-product totals over a window, with the product's current category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

/// Product totals for a week, a month or any other window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodProductSummary {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub total_sales: f64,
    /// Highest revenue first.
    pub products: Vec<ProductSales>,
}

/// Summary shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    /// Day the figures belong to.
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// True when today had no bills and the latest day with sales was used.
    pub is_fallback: bool,
    pub summary: SalesSummary,
}

/// Counters for the header bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuickStats {
    pub today_bills: i64,
    pub today_sales: f64,
    pub active_products: i64,
    pub low_stock_items: i64,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Aggregates bills into a [`SalesSummary`].
///
/// Cancelled bills are skipped even if the caller passed them in.
/// `category_of` maps a product id to its current category label.
pub fn summarize<F>(bills: &[Bill], category_of: F) -> SalesSummary
where
    F: Fn(&str) -> String,
{
    let mut summary = SalesSummary::default();
    let mut first = None;
    let mut last = None;

    for bill in bills.iter().filter(|b| !b.is_cancelled()) {
        summary.total_bills += 1;
        summary.total_sales += bill.total_amount;

        let hour = format!("{:02}:00", bill.created_at.hour());
        *summary.hourly_sales.entry(hour).or_insert(0.0) += bill.total_amount;

        for item in &bill.items {
            *summary
                .category_totals
                .entry(category_of(&item.product_id))
                .or_insert(0.0) += item.line_total();
        }

        first = match first {
            Some(t) if t <= bill.created_at => Some(t),
            _ => Some(bill.created_at),
        };
        last = match last {
            Some(t) if t >= bill.created_at => Some(t),
            _ => Some(bill.created_at),
        };
    }

    if summary.total_bills > 0 {
        summary.average_bill_value = summary.total_sales / summary.total_bills as f64;
    }
    summary.first_bill_time = first.map(|t| t.format("%H:%M:%S").to_string());
    summary.last_bill_time = last.map(|t| t.format("%H:%M:%S").to_string());
    summary.peak_hour = peak_hour(&summary.hourly_sales);

    summary
}

fn peak_hour(hourly: &BTreeMap<String, f64>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (hour, total) in hourly {
        match best {
            Some((_, top)) if *total <= top => {}
            _ => best = Some((hour, *total)),
        }
    }
    best.map(|(hour, _)| hour.clone())
}

/// Best sellers by revenue, from the bills' own snapshots.
///
/// Products keep the name of their first occurrence. Equal revenue keeps
/// first-seen order.
pub fn top_selling_products(bills: &[Bill], limit: usize) -> Vec<TopProduct> {
    let mut rows: Vec<TopProduct> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for bill in bills.iter().filter(|b| !b.is_cancelled()) {
        for item in &bill.items {
            let slot = *index.entry(item.product_id.as_str()).or_insert_with(|| {
                rows.push(TopProduct {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity_sold: 0,
                    total_sales: 0.0,
                });
                rows.len() - 1
            });
            rows[slot].quantity_sold += item.quantity;
            rows[slot].total_sales += item.line_total();
        }
    }

    rows.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));
    rows.truncate(limit);
    rows
}

/// Per-product quantity and revenue with current categories, highest
/// revenue first.
pub fn product_sales<F>(bills: &[Bill], category_of: F) -> Vec<ProductSales>
where
    F: Fn(&str) -> String,
{
    top_selling_products(bills, usize::MAX)
        .into_iter()
        .map(|row| ProductSales {
            category: category_of(&row.product_id),
            product_id: row.product_id,
            name: row.name,
            total_quantity: row.quantity_sold,
            total_revenue: row.total_sales,
        })
        .collect()
}

/// [`product_sales`] for `range`, with the window's total.
pub fn period_summary<F>(range: DateRange, bills: &[Bill], category_of: F) -> PeriodProductSummary
where
    F: Fn(&str) -> String,
{
    let products = product_sales(bills, category_of);
    PeriodProductSummary {
        start_date: range.start,
        end_date: range.end,
        total_sales: products.iter().map(|p| p.total_revenue).sum(),
        products,
    }
}
