//! # Report Aggregator
//!
//! Read-side summaries. Loads confirmed bills through the bill repository,
//! resolves categories against the current catalog and hands both to the
//! pure aggregation in [`rebill_core::summary`].
//!
//! Nothing here writes. An empty window yields zeroed totals, never an
//! error.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::ServiceResult;
use crate::local_now;
use crate::pool::Database;
use crate::repository::bill::BillFilter;
use rebill_core::summary::{
    period_summary, summarize, top_selling_products, UNKNOWN_CATEGORY,
};
use rebill_core::{
    Bill, DashboardSummary, DateRange, PeriodProductSummary, QuickStats, SalesSummary, TopProduct,
};

/// Sales reporting service.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    db: Database,
}

impl ReportAggregator {
    pub fn new(db: Database) -> Self {
        ReportAggregator { db }
    }

    async fn bills(&self, filter: BillFilter) -> ServiceResult<Vec<Bill>> {
        Ok(self.db.bills().list(filter).await?)
    }

    async fn summarize(&self, bills: &[Bill]) -> ServiceResult<SalesSummary> {
        let labels = self.db.products().category_labels().await?;
        Ok(summarize(bills, |id| category_of(&labels, id)))
    }

    // =========================================================================
    // Sales Summaries
    // =========================================================================

    /// Summary of today's confirmed bills.
    pub async fn todays_summary(&self) -> ServiceResult<SalesSummary> {
        self.summary_for_date(local_now().date()).await
    }

    pub async fn summary_for_date(&self, date: NaiveDate) -> ServiceResult<SalesSummary> {
        let bills = self.bills(BillFilter::Day(date)).await?;
        self.summarize(&bills).await
    }

    /// Summary over an inclusive day range.
    pub async fn summary_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<SalesSummary> {
        let range = DateRange::new(start, end)?;
        let bills = self.bills(BillFilter::Range(range)).await?;
        self.summarize(&bills).await
    }

    /// Today's summary, or the latest day with sales when today has none.
    pub async fn dashboard_summary(&self) -> ServiceResult<DashboardSummary> {
        self.dashboard_summary_on(local_now().date()).await
    }

    pub async fn dashboard_summary_on(&self, today: NaiveDate) -> ServiceResult<DashboardSummary> {
        let bills = self.bills(BillFilter::Day(today)).await?;
        if !bills.is_empty() {
            return Ok(DashboardSummary {
                date: today,
                is_fallback: false,
                summary: self.summarize(&bills).await?,
            });
        }

        match self.db.bills().latest_sale_date().await? {
            Some(latest) if latest != today => Ok(DashboardSummary {
                date: latest,
                is_fallback: true,
                summary: self.summary_for_date(latest).await?,
            }),
            _ => Ok(DashboardSummary {
                date: today,
                is_fallback: false,
                summary: SalesSummary::default(),
            }),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Today's best sellers by revenue.
    pub async fn top_selling_products(&self, limit: usize) -> ServiceResult<Vec<TopProduct>> {
        self.top_selling_products_on(local_now().date(), limit).await
    }

    pub async fn top_selling_products_on(
        &self,
        day: NaiveDate,
        limit: usize,
    ) -> ServiceResult<Vec<TopProduct>> {
        let bills = self.bills(BillFilter::DayByNumber(day)).await?;
        Ok(top_selling_products(&bills, limit))
    }

    /// Per-product totals over an inclusive day range.
    pub async fn product_sales_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<PeriodProductSummary> {
        self.product_summary(DateRange::new(start, end)?).await
    }

    /// Per-product totals for the Monday to Sunday week containing `date`.
    pub async fn weekly_product_summary(
        &self,
        date: NaiveDate,
    ) -> ServiceResult<PeriodProductSummary> {
        self.product_summary(DateRange::week_of(date)).await
    }

    /// Per-product totals for a calendar month.
    pub async fn monthly_product_summary(
        &self,
        year: i32,
        month: u32,
    ) -> ServiceResult<PeriodProductSummary> {
        self.product_summary(DateRange::month(year, month)?).await
    }

    async fn product_summary(&self, range: DateRange) -> ServiceResult<PeriodProductSummary> {
        let bills = self.bills(BillFilter::Range(range)).await?;
        let labels = self.db.products().category_labels().await?;
        Ok(period_summary(range, &bills, |id| category_of(&labels, id)))
    }

    // =========================================================================
    // Counters
    // =========================================================================

    pub async fn quick_stats(&self) -> ServiceResult<QuickStats> {
        self.quick_stats_on(local_now().date()).await
    }

    /// Bill count and sales of `day`, active products, low-stock rows.
    pub async fn quick_stats_on(&self, day: NaiveDate) -> ServiceResult<QuickStats> {
        let bills = self.bills(BillFilter::Day(day)).await?;

        Ok(QuickStats {
            today_bills: bills.len() as i64,
            today_sales: bills.iter().map(|b| b.total_amount).sum(),
            active_products: self.db.products().count_active().await?,
            low_stock_items: self.db.inventory_items().count_low_stock().await?,
        })
    }
}

fn category_of(labels: &HashMap<String, String>, product_id: &str) -> String {
    labels
        .get(product_id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use chrono::NaiveDateTime;
    use rebill_core::{BillLineRequest, NewBill, NewProduct, ProductUpdate};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 10, 0).unwrap()
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, price, category) in [("A1", 25.0, "coldrink"), ("P1", 10.0, "paan")] {
            db.catalog()
                .create_product(NewProduct {
                    product_id: id.to_string(),
                    name: id.to_string(),
                    price,
                    category: Some(category.to_string()),
                    image_filename: None,
                })
                .await
                .unwrap();
        }
        db
    }

    async fn sell(db: &Database, when: NaiveDateTime, items: &[(&str, i64)]) -> i64 {
        let lines = items
            .iter()
            .map(|(id, qty)| BillLineRequest::new(*id, *qty))
            .collect();
        db.billing()
            .create_bill_at(NewBill::cash(lines), when)
            .await
            .unwrap()
            .bill_no
    }

    #[tokio::test]
    async fn test_empty_day_is_zeroed() {
        let db = setup().await;
        let summary = db.reports().summary_for_date(day(14)).await.unwrap();
        assert_eq!(summary, SalesSummary::default());
        assert!(summary.first_bill_time.is_none());
    }

    #[tokio::test]
    async fn test_summary_uses_current_categories() {
        let db = setup().await;
        sell(&db, at(14, 9), &[("A1", 2), ("P1", 1)]).await;

        let before = db.reports().summary_for_date(day(14)).await.unwrap();
        assert_eq!(before.category_totals["coldrink"], 50.0);

        db.catalog()
            .update_product(
                "A1",
                ProductUpdate {
                    category: Some("paan".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = db.reports().summary_for_date(day(14)).await.unwrap();
        assert_eq!(after.category_totals["paan"], 60.0);
        assert!(!after.category_totals.contains_key("coldrink"));
        assert_eq!(after.total_sales, 60.0);
    }

    #[tokio::test]
    async fn test_cancelled_bills_excluded() {
        let db = setup().await;
        sell(&db, at(14, 9), &[("A1", 1)]).await;
        let second = sell(&db, at(14, 10), &[("A1", 4)]).await;
        db.billing().cancel_bill_on(second, day(14)).await.unwrap();

        let summary = db.reports().summary_for_date(day(14)).await.unwrap();
        assert_eq!(summary.total_bills, 1);
        assert_eq!(summary.total_sales, 25.0);

        let top = db.reports().top_selling_products_on(day(14), 10).await.unwrap();
        assert_eq!(top[0].quantity_sold, 1);
    }

    #[tokio::test]
    async fn test_dashboard_falls_back_to_latest_sales_day() {
        let db = setup().await;
        sell(&db, at(12, 9), &[("P1", 3)]).await;

        let dashboard = db.reports().dashboard_summary_on(day(14)).await.unwrap();
        assert!(dashboard.is_fallback);
        assert_eq!(dashboard.date, day(12));
        assert_eq!(dashboard.summary.total_sales, 30.0);

        sell(&db, at(14, 9), &[("A1", 1)]).await;
        let dashboard = db.reports().dashboard_summary_on(day(14)).await.unwrap();
        assert!(!dashboard.is_fallback);
        assert_eq!(dashboard.summary.total_sales, 25.0);
    }

    #[tokio::test]
    async fn test_weekly_and_monthly_windows() {
        let db = setup().await;
        sell(&db, at(10, 9), &[("A1", 1)]).await; // Monday
        sell(&db, at(16, 9), &[("P1", 2)]).await; // Sunday
        sell(&db, at(17, 9), &[("A1", 4)]).await; // next Monday

        let week = db.reports().weekly_product_summary(day(14)).await.unwrap();
        assert_eq!(week.start_date, day(10));
        assert_eq!(week.end_date, day(16));
        assert_eq!(week.total_sales, 45.0);
        assert_eq!(week.products[0].product_id, "A1");

        let month = db.reports().monthly_product_summary(2024, 6).await.unwrap();
        assert_eq!(month.total_sales, 145.0);
        assert_eq!(month.products[0].total_quantity, 5);
        assert_eq!(month.products[1].category, "paan");
    }

    #[tokio::test]
    async fn test_quick_stats() {
        let db = setup().await;
        sell(&db, at(14, 9), &[("A1", 2)]).await;
        sell(&db, at(14, 11), &[("P1", 1)]).await;

        let stats = db.reports().quick_stats_on(day(14)).await.unwrap();
        assert_eq!(stats.today_bills, 2);
        assert_eq!(stats.today_sales, 60.0);
        assert_eq!(stats.active_products, 2);
        assert_eq!(stats.low_stock_items, 0);
    }
}
