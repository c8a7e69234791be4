//! # Billing Manager
//!
//! Bill lifecycle: creation with numbering and stock deduction, lookups,
//! cancellation, edits and the destructive clear.
//!
//! ## Create Bill
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_lines()                 fail fast, nothing written            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve products (pool)          unknown / inactive → ProductNotFound  │
//! │  snapshot name + price            total = Σ price × qty                 │
//! │  read bill_reset_daily (pool)     → NumberingScope                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── BEGIN IMMEDIATE ─────────────────┐  (write lock)    │
//! │  │ INSERT bill, bill_no = MAX(scope) + 1              │               │
//! │  │ INSERT items in order                              │               │
//! │  │ deduct linked inventory per line                   │               │
//! │  └──────────────────── COMMIT ──────────────────────┘                  │
//! │       │                                                                 │
//! │       ├── UNIQUE(bill_no, day) or busy → roll back, retry (≤ 5)        │
//! │       ▼                                                                 │
//! │  Bill { bill_no, items, total }                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known Limitations
//! - Cancelling does not give deducted stock back.
//! - Editing a bill does not reconcile stock for changed quantities.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::local_now;
use crate::pool::Database;
use crate::repository::bill::{BillFilter, BillHeader, BillRepository};
use crate::service::inventory::InventoryLedger;
use rebill_core::billing::{
    bill_total, next_bill_number, snapshot_line, validate_lines, BILL_NUMBER_ATTEMPTS,
};
use rebill_core::{
    Bill, BillItem, BillLineRequest, BillStatus, BillUpdate, CoreError, DateRange, NewBill,
    NumberingScope, Product,
};

/// Pause before retry `n` is `n × RETRY_BACKOFF`.
const RETRY_BACKOFF: Duration = Duration::from_millis(15);

/// Bill service.
#[derive(Debug, Clone)]
pub struct BillingManager {
    db: Database,
}

impl BillingManager {
    pub fn new(db: Database) -> Self {
        BillingManager { db }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a confirmed bill stamped with the current local time.
    pub async fn create_bill(&self, request: NewBill) -> ServiceResult<Bill> {
        self.create_bill_at(request, local_now()).await
    }

    /// Creates a confirmed bill stamped `now`.
    ///
    /// Number assignment, line items and stock deduction commit together.
    /// A number collision rolls everything back and retries with a fresh
    /// number; after [`BILL_NUMBER_ATTEMPTS`] collisions the call fails with
    /// [`CoreError::BillNumberConflict`].
    pub async fn create_bill_at(&self, request: NewBill, now: NaiveDateTime) -> ServiceResult<Bill> {
        validate_lines(&request.items)?;
        let items = self.snapshot_lines(&request.items).await?;
        let total_amount = bill_total(&items);

        let reset_daily = self.db.settings().bill_reset_daily().await?;
        let scope = NumberingScope::for_policy(reset_daily, now.date());

        let customer_name = normalize_customer(request.customer_name.as_deref());
        let header = BillHeader {
            customer_name: customer_name.as_deref(),
            payment_method: request.payment_method,
            total_amount,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.insert_bill(scope, header, &items, now).await {
                Ok(bill) => {
                    info!(
                        bill_no = bill.bill_no,
                        total = bill.total_amount,
                        lines = bill.items.len(),
                        attempt,
                        "Bill created"
                    );
                    return Ok(bill);
                }
                Err(ServiceError::Db(e)) if e.is_retryable() => {
                    if attempt >= BILL_NUMBER_ATTEMPTS {
                        warn!(attempt, error = %e, "Giving up on bill number assignment");
                        return Err(CoreError::BillNumberConflict { attempts: attempt }.into());
                    }
                    warn!(attempt, error = %e, "Bill number collision, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt: a single transaction that either lands fully or not at all.
    async fn insert_bill(
        &self,
        scope: NumberingScope,
        header: BillHeader<'_>,
        items: &[BillItem],
        now: NaiveDateTime,
    ) -> ServiceResult<Bill> {
        let mut tx = self.db.begin_write().await?;

        // MAX(bill_no) is read under the write lock, inside the INSERT.
        let (id, bill_no) = BillRepository::insert_next(&mut tx, scope, header, now).await?;
        BillRepository::insert_items(&mut tx, id, items).await?;
        for item in items {
            InventoryLedger::deduct(&mut tx, &item.product_id, item.quantity, now).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        Ok(Bill {
            id,
            bill_no,
            customer_name: header.customer_name.map(str::to_string),
            total_amount: header.total_amount,
            payment_method: header.payment_method,
            status: BillStatus::Confirmed,
            items: items.to_vec(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Resolves every line against the active catalog and freezes it.
    async fn snapshot_lines(&self, lines: &[BillLineRequest]) -> ServiceResult<Vec<BillItem>> {
        let repo = self.db.products();
        let mut products: HashMap<&str, Product> = HashMap::new();

        for line in lines {
            let id = line.product_id.trim();
            if products.contains_key(id) {
                continue;
            }
            let product = repo
                .get(id)
                .await?
                .filter(|p| p.active)
                .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
            products.insert(id, product);
        }

        Ok(lines
            .iter()
            .filter_map(|line| {
                products
                    .get(line.product_id.trim())
                    .map(|product| snapshot_line(product, line))
            })
            .collect())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Bill numbered `bill_no` from today's bills only.
    ///
    /// Earlier days reuse the same numbers; use [`get_bill_on`](Self::get_bill_on)
    /// for those.
    pub async fn get_bill(&self, bill_no: i64) -> ServiceResult<Bill> {
        self.get_bill_on(bill_no, local_now().date()).await
    }

    /// Bill numbered `bill_no` among the bills of `day`, any status.
    pub async fn get_bill_on(&self, bill_no: i64, day: NaiveDate) -> ServiceResult<Bill> {
        self.db
            .bills()
            .find_on(bill_no, day)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(bill_no).into())
    }

    /// Today's confirmed bills by bill number.
    pub async fn todays_bills(&self) -> ServiceResult<Vec<Bill>> {
        self.todays_bills_on(local_now().date()).await
    }

    /// Confirmed bills of `day` by bill number.
    pub async fn todays_bills_on(&self, day: NaiveDate) -> ServiceResult<Vec<Bill>> {
        Ok(self.db.bills().list(BillFilter::DayByNumber(day)).await?)
    }

    /// Confirmed bills of `date` by creation time.
    pub async fn bills_for_date(&self, date: NaiveDate) -> ServiceResult<Vec<Bill>> {
        Ok(self.db.bills().list(BillFilter::Day(date)).await?)
    }

    /// Confirmed bills from `start` to `end` inclusive, by creation time.
    pub async fn bills_between(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<Bill>> {
        let range = DateRange::new(start, end)?;
        Ok(self.db.bills().list(BillFilter::Range(range)).await?)
    }

    /// Every bill including cancelled ones, newest first.
    pub async fn all_bills(&self) -> ServiceResult<Vec<Bill>> {
        Ok(self.db.bills().list(BillFilter::All).await?)
    }

    /// Every confirmed bill, newest first.
    pub async fn all_confirmed_bills(&self) -> ServiceResult<Vec<Bill>> {
        Ok(self.db.bills().list(BillFilter::AllConfirmed).await?)
    }

    /// Number the next bill would get right now. Nothing is reserved.
    pub async fn next_bill_number(&self) -> ServiceResult<i64> {
        self.next_bill_number_on(local_now().date()).await
    }

    pub async fn next_bill_number_on(&self, day: NaiveDate) -> ServiceResult<i64> {
        let reset_daily = self.db.settings().bill_reset_daily().await?;
        let scope = NumberingScope::for_policy(reset_daily, day);
        let max = self.db.bills().max_bill_no(scope).await?;
        Ok(next_bill_number(max))
    }

    // =========================================================================
    // Changes
    // =========================================================================

    /// Cancels today's bill `bill_no`. Stock is not given back.
    pub async fn cancel_bill(&self, bill_no: i64) -> ServiceResult<Bill> {
        self.cancel_bill_on(bill_no, local_now().date()).await
    }

    /// Cancels bill `bill_no` of `day`.
    pub async fn cancel_bill_on(&self, bill_no: i64, day: NaiveDate) -> ServiceResult<Bill> {
        let cancelled = {
            let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
            BillRepository::cancel_on(&mut conn, bill_no, day, local_now()).await?
        };

        if !cancelled {
            return Err(self.missing_or_cancelled(bill_no, day).await);
        }

        info!(bill_no, %day, "Bill cancelled");
        self.get_bill_on(bill_no, day).await
    }

    /// Replaces the items of today's confirmed bill `bill_no`.
    pub async fn update_bill(&self, bill_no: i64, update: BillUpdate) -> ServiceResult<Bill> {
        self.update_bill_on(bill_no, local_now().date(), update).await
    }

    /// Replaces the items of confirmed bill `bill_no` of `day`.
    ///
    /// Lines are snapshotted again from the catalog as it is now and the
    /// total is recomputed. Stock is left as it was.
    pub async fn update_bill_on(
        &self,
        bill_no: i64,
        day: NaiveDate,
        update: BillUpdate,
    ) -> ServiceResult<Bill> {
        validate_lines(&update.items)?;
        let items = self.snapshot_lines(&update.items).await?;
        let total_amount = bill_total(&items);
        let customer_name = normalize_customer(update.customer_name.as_deref());

        let mut tx = self.db.begin_write().await?;
        let updated = BillRepository::update_header_on(
            &mut tx,
            bill_no,
            day,
            customer_name.as_deref(),
            update.payment_method,
            total_amount,
            local_now(),
        )
        .await?;

        let Some(id) = updated else {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(self.missing_or_cancelled(bill_no, day).await);
        };

        BillRepository::replace_items(&mut tx, id, &items).await?;
        let bill = BillRepository::get_by_id_in_tx(&mut tx, id)
            .await?
            .ok_or(CoreError::BillNotFound(bill_no))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(bill_no, %day, total = bill.total_amount, "Bill updated");
        Ok(bill)
    }

    /// Deletes every bill and restarts numbering. Irreversible.
    pub async fn clear_all_bills(&self) -> ServiceResult<u64> {
        let mut tx = self.db.begin_write().await?;
        let removed = BillRepository::delete_all(&mut tx).await?;
        tx.commit().await.map_err(DbError::from)?;

        warn!(removed, "All bills deleted");
        Ok(removed)
    }

    /// Explains why no confirmed bill matched.
    async fn missing_or_cancelled(&self, bill_no: i64, day: NaiveDate) -> ServiceError {
        match self.db.bills().status_on(bill_no, day).await {
            Ok(Some(BillStatus::Cancelled)) => CoreError::BillCancelled(bill_no).into(),
            Ok(_) => CoreError::BillNotFound(bill_no).into(),
            Err(e) => e.into(),
        }
    }
}

fn normalize_customer(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
