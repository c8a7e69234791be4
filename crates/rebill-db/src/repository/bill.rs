//! # Bill Repository
//!
//! Database operations for bills and their line items.
//!
//! ## Storage Layout
//! ```text
//! bills                                   bill_items
//! ┌────┬─────────┬────────┬───────────┐   ┌─────────┬──────────┬────────────┐
//! │ id │ bill_no │ status │created_at │   │ bill_id │ position │ name,price │
//! ├────┼─────────┼────────┼───────────┤   ├─────────┼──────────┼────────────┤
//! │ 41 │    1    │CONFIRMED 06-14 09:│◄──│   41    │    0     │ Cola, 25.0 │
//! │ 42 │    2    │CANCELLED 06-14 10:│   │   41    │    1     │ Paan, 15.0 │
//! │ 43 │    1    │CONFIRMED 06-15 08:│   │   42    │    0     │ ...        │
//! └────┴─────────┴────────┴───────────┘   └─────────┴──────────┴────────────┘
//!        ▲
//!        └── UNIQUE (bill_no, date(created_at))
//! ```
//!
//! Line items are a child table ordered by `position`, written once per
//! bill (or replaced wholesale by an edit) and never recomputed from the
//! catalog.
//!
//! ## Numbering
//! [`BillRepository::insert_next`] computes `MAX(bill_no) + 1` and inserts in
//! one statement. Run as the first statement of a transaction it takes the
//! write lock immediately, and the unique index rejects any number that
//! slipped past a concurrent writer.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rebill_core::{Bill, BillItem, BillStatus, DateRange, NumberingScope, PaymentMethod};

macro_rules! select_bill {
    () => {
        "SELECT id, bill_no, customer_name, total_amount, payment_method, status, \
         created_at, updated_at FROM bills"
    };
}

/// Status values are compared trimmed and uppercased; older rows were
/// written by hand.
const CONFIRMED_ONLY: &str = "UPPER(TRIM(status)) = 'CONFIRMED'";

/// SQLite's default cap on bound parameters is far above this.
const ITEM_CHUNK: usize = 500;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct BillRecord {
    id: i64,
    bill_no: i64,
    customer_name: Option<String>,
    total_amount: f64,
    payment_method: String,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Debug, FromRow)]
struct BillItemRecord {
    bill_id: i64,
    product_id: String,
    name: String,
    price: f64,
    quantity: i64,
}

impl BillRecord {
    fn into_bill(self, items: Vec<BillItem>) -> DbResult<Bill> {
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|_| DbError::corrupt("bills.payment_method", &self.payment_method))?;
        let status = self
            .status
            .parse::<BillStatus>()
            .map_err(|_| DbError::corrupt("bills.status", &self.status))?;

        Ok(Bill {
            id: self.id,
            bill_no: self.bill_no,
            customer_name: self.customer_name,
            total_amount: self.total_amount,
            payment_method,
            status,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Which bills a listing returns, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillFilter {
    /// Confirmed bills of one day, by bill number.
    DayByNumber(NaiveDate),
    /// Confirmed bills of one day, by creation time.
    Day(NaiveDate),
    /// Confirmed bills in an inclusive day range, by creation time.
    Range(DateRange),
    /// Every confirmed bill, newest first.
    AllConfirmed,
    /// Every bill including cancelled ones, newest first.
    All,
}

/// Header fields written when a bill is created.
#[derive(Debug, Clone, Copy)]
pub struct BillHeader<'a> {
    pub customer_name: Option<&'a str>,
    pub payment_method: PaymentMethod,
    pub total_amount: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Bill numbered `bill_no` among the bills created on `day`.
    pub async fn find_on(&self, bill_no: i64, day: NaiveDate) -> DbResult<Option<Bill>> {
        // Header and items are read from one snapshot.
        let mut tx = self.pool.begin().await?;
        let bill = Self::find_on_in_tx(&mut tx, bill_no, day).await?;
        tx.commit().await?;
        Ok(bill)
    }

    /// Same as [`find_on`](Self::find_on), inside the caller's transaction.
    pub async fn find_on_in_tx(
        conn: &mut SqliteConnection,
        bill_no: i64,
        day: NaiveDate,
    ) -> DbResult<Option<Bill>> {
        let record = sqlx::query_as::<_, BillRecord>(concat!(
            select_bill!(),
            " WHERE bill_no = ?1 AND date(created_at) = ?2"
        ))
        .bind(bill_no)
        .bind(day)
        .fetch_optional(&mut *conn)
        .await?;

        match record {
            Some(record) => Ok(attach_items(conn, vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Bill by surrogate id, inside the caller's transaction.
    pub async fn get_by_id_in_tx(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Bill>> {
        let record = sqlx::query_as::<_, BillRecord>(concat!(select_bill!(), " WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match record {
            Some(record) => Ok(attach_items(conn, vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Bills matching `filter`, each with its items in entry order.
    pub async fn list(&self, filter: BillFilter) -> DbResult<Vec<Bill>> {
        let mut query = QueryBuilder::<Sqlite>::new(select_bill!());

        match filter {
            BillFilter::DayByNumber(day) | BillFilter::Day(day) => {
                query
                    .push(" WHERE ")
                    .push(CONFIRMED_ONLY)
                    .push(" AND date(created_at) = ")
                    .push_bind(day);
            }
            BillFilter::Range(range) => {
                query
                    .push(" WHERE ")
                    .push(CONFIRMED_ONLY)
                    .push(" AND date(created_at) BETWEEN ")
                    .push_bind(range.start)
                    .push(" AND ")
                    .push_bind(range.end);
            }
            BillFilter::AllConfirmed => {
                query.push(" WHERE ").push(CONFIRMED_ONLY);
            }
            BillFilter::All => {}
        }

        query.push(match filter {
            BillFilter::DayByNumber(_) => " ORDER BY bill_no",
            BillFilter::Day(_) | BillFilter::Range(_) => " ORDER BY created_at, id",
            BillFilter::AllConfirmed | BillFilter::All => " ORDER BY created_at DESC, id DESC",
        });

        let mut tx = self.pool.begin().await?;
        let records = query
            .build_query_as::<BillRecord>()
            .fetch_all(&mut *tx)
            .await?;
        let bills = attach_items(&mut tx, records).await?;
        tx.commit().await?;

        debug!(?filter, count = bills.len(), "Listed bills");
        Ok(bills)
    }

    /// Highest number in scope, cancelled bills included.
    pub async fn max_bill_no(&self, scope: NumberingScope) -> DbResult<Option<i64>> {
        let max = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(bill_no) FROM bills WHERE ?1 IS NULL OR date(created_at) = ?1",
        )
        .bind(scope.day())
        .fetch_one(&self.pool)
        .await?;

        Ok(max)
    }

    /// Most recent day with at least one confirmed bill.
    pub async fn latest_sale_date(&self) -> DbResult<Option<NaiveDate>> {
        let raw = sqlx::query_scalar::<_, Option<String>>(concat!(
            "SELECT MAX(date(created_at)) FROM bills WHERE ",
            "UPPER(TRIM(status)) = 'CONFIRMED'"
        ))
        .fetch_one(&self.pool)
        .await?;

        raw.map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| DbError::corrupt("bills.created_at", s))
        })
        .transpose()
    }

    /// Status of the bill numbered `bill_no` on `day`.
    pub async fn status_on(&self, bill_no: i64, day: NaiveDate) -> DbResult<Option<BillStatus>> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT status FROM bills WHERE bill_no = ?1 AND date(created_at) = ?2",
        )
        .bind(bill_no)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|s| {
            s.parse::<BillStatus>()
                .map_err(|_| DbError::corrupt("bills.status", s))
        })
        .transpose()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts a confirmed bill numbered one past the highest in `scope`.
    ///
    /// Returns `(id, bill_no)`. A concurrent writer that claimed the same
    /// number surfaces as [`DbError::UniqueViolation`] or [`DbError::Busy`].
    pub async fn insert_next(
        conn: &mut SqliteConnection,
        scope: NumberingScope,
        header: BillHeader<'_>,
        now: NaiveDateTime,
    ) -> DbResult<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            INSERT INTO bills (
                bill_no, customer_name, total_amount, payment_method,
                status, created_at, updated_at
            )
            SELECT COALESCE(MAX(bill_no), 0) + 1, ?1, ?2, ?3, 'CONFIRMED', ?4, ?4
            FROM bills
            WHERE ?5 IS NULL OR date(created_at) = ?5
            RETURNING id, bill_no
            "#,
        )
        .bind(header.customer_name)
        .bind(header.total_amount)
        .bind(header.payment_method.as_str())
        .bind(now)
        .bind(scope.day())
        .fetch_one(conn)
        .await?;

        debug!(id = row.0, bill_no = row.1, ?scope, "Inserted bill");
        Ok(row)
    }

    /// Writes `items` under `bill_id` in order.
    pub async fn insert_items(
        conn: &mut SqliteConnection,
        bill_id: i64,
        items: &[BillItem],
    ) -> DbResult<()> {
        for (chunk_no, chunk) in items.chunks(ITEM_CHUNK).enumerate() {
            let offset = chunk_no * ITEM_CHUNK;
            let mut query = QueryBuilder::<Sqlite>::new(
                "INSERT INTO bill_items (bill_id, position, product_id, name, price, quantity) ",
            );
            query.push_values(chunk.iter().enumerate(), |mut row, (i, item)| {
                row.push_bind(bill_id)
                    .push_bind((offset + i) as i64)
                    .push_bind(item.product_id.as_str())
                    .push_bind(item.name.as_str())
                    .push_bind(item.price)
                    .push_bind(item.quantity);
            });
            query.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Replaces the items of `bill_id` wholesale.
    pub async fn replace_items(
        conn: &mut SqliteConnection,
        bill_id: i64,
        items: &[BillItem],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1")
            .bind(bill_id)
            .execute(&mut *conn)
            .await?;
        Self::insert_items(conn, bill_id, items).await
    }

    /// Marks the confirmed bill `bill_no` of `day` cancelled.
    ///
    /// Returns false when no confirmed bill matched.
    pub async fn cancel_on(
        conn: &mut SqliteConnection,
        bill_no: i64,
        day: NaiveDate,
        now: NaiveDateTime,
    ) -> DbResult<bool> {
        let result = sqlx::query(concat!(
            "UPDATE bills SET status = 'CANCELLED', updated_at = ?3 ",
            "WHERE bill_no = ?1 AND date(created_at) = ?2 AND UPPER(TRIM(status)) = 'CONFIRMED'"
        ))
        .bind(bill_no)
        .bind(day)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rewrites the header of the confirmed bill `bill_no` of `day`.
    ///
    /// `None` keeps the stored customer name or payment method. Returns the
    /// bill's id, or `None` when no confirmed bill matched.
    pub async fn update_header_on(
        conn: &mut SqliteConnection,
        bill_no: i64,
        day: NaiveDate,
        customer_name: Option<&str>,
        payment_method: Option<PaymentMethod>,
        total_amount: f64,
        now: NaiveDateTime,
    ) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE bills SET
                customer_name = COALESCE(?3, customer_name),
                payment_method = COALESCE(?4, payment_method),
                total_amount = ?5,
                updated_at = ?6
            WHERE bill_no = ?1
              AND date(created_at) = ?2
              AND UPPER(TRIM(status)) = 'CONFIRMED'
            RETURNING id
            "#,
        )
        .bind(bill_no)
        .bind(day)
        .bind(customer_name)
        .bind(payment_method.map(|m| m.as_str()))
        .bind(total_amount)
        .bind(now)
        .fetch_optional(conn)
        .await?;

        Ok(id)
    }

    /// Deletes every bill and restarts the id sequence. Returns bills removed.
    pub async fn delete_all(conn: &mut SqliteConnection) -> DbResult<u64> {
        sqlx::query("DELETE FROM bill_items")
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM bills")
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'bills'")
            .execute(&mut *conn)
            .await?;

        debug!(removed = result.rows_affected(), "Deleted all bills");
        Ok(result.rows_affected())
    }
}

/// Loads the items of `records` and assembles bills in record order.
async fn attach_items(
    conn: &mut SqliteConnection,
    records: Vec<BillRecord>,
) -> DbResult<Vec<Bill>> {
    let mut items_by_bill: HashMap<i64, Vec<BillItem>> = HashMap::new();

    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    for chunk in ids.chunks(ITEM_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT bill_id, product_id, name, price, quantity FROM bill_items WHERE bill_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY bill_id, position");

        let rows = query
            .build_query_as::<BillItemRecord>()
            .fetch_all(&mut *conn)
            .await?;

        for row in rows {
            items_by_bill.entry(row.bill_id).or_default().push(BillItem {
                product_id: row.product_id,
                name: row.name,
                price: row.price,
                quantity: row.quantity,
            });
        }
    }

    records
        .into_iter()
        .map(|record| {
            let items = items_by_bill.remove(&record.id).unwrap_or_default();
            record.into_bill(items)
        })
        .collect()
}
