//! # Inventory Repository
//!
//! Database operations for stock rows.
//!
//! Every read joins the linked product so the lock flag can be derived in
//! the same query. Stock changes are single `UPDATE` statements computed by
//! SQLite, never read-modify-write in Rust.

use chrono::NaiveDateTime;
use sqlx::{FromRow, SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rebill_core::{InventoryItem, InventoryView, NewInventoryItem};

macro_rules! select_inventory {
    () => {
        "SELECT i.id, i.name, i.type, i.unit, i.stock, i.unit_price, i.alert_threshold, \
         i.max_stock_history, i.product_id, i.created_at, i.updated_at, \
         p.active AS product_active \
         FROM inventory i LEFT JOIN products p ON p.product_id = i.product_id"
    };
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    #[sqlx(flatten)]
    item: InventoryItem,
    product_active: Option<bool>,
}

impl From<InventoryRow> for InventoryView {
    fn from(row: InventoryRow) -> Self {
        InventoryView::new(row.item, row.product_active)
    }
}

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets a row with its derived status and lock flag.
    pub async fn get(&self, id: i64) -> DbResult<Option<InventoryView>> {
        fetch(&self.pool, id).await
    }

    /// Same as [`get`](Self::get), inside the caller's transaction.
    pub async fn get_in_tx(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<InventoryView>> {
        fetch(conn, id).await
    }

    /// All rows ordered by name.
    pub async fn list(&self) -> DbResult<Vec<InventoryView>> {
        let rows = sqlx::query_as::<_, InventoryRow>(concat!(
            select_inventory!(),
            " ORDER BY i.name COLLATE NOCASE, i.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryView::from).collect())
    }

    /// Rows at or below their alert threshold, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<InventoryView>> {
        let rows = sqlx::query_as::<_, InventoryRow>(concat!(
            select_inventory!(),
            " WHERE i.stock <= i.alert_threshold ORDER BY i.stock, i.name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryView::from).collect())
    }

    pub async fn count_low_stock(&self) -> DbResult<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE stock <= alert_threshold")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Id of the row linked to `product_id`, if any.
    pub async fn find_by_product_in_tx(
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM inventory WHERE product_id = ?1")
            .bind(product_id)
            .fetch_optional(conn)
            .await?;
        Ok(id)
    }

    /// Inserts a row and returns its id.
    pub async fn insert(
        conn: &mut SqliteConnection,
        item: &NewInventoryItem,
        max_stock_history: f64,
        now: NaiveDateTime,
    ) -> DbResult<i64> {
        debug!(name = %item.name, product_id = ?item.product_id, "Inserting inventory item");

        let result = sqlx::query(
            r#"
            INSERT INTO inventory (
                name, type, unit, stock, unit_price, alert_threshold,
                max_stock_history, product_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&item.name)
        .bind(item.item_type)
        .bind(&item.unit)
        .bind(item.stock)
        .bind(item.unit_price)
        .bind(item.alert_threshold)
        .bind(max_stock_history)
        .bind(&item.product_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Writes every mutable column of `item`.
    pub async fn update(conn: &mut SqliteConnection, item: &InventoryItem) -> DbResult<()> {
        debug!(id = item.id, "Updating inventory item");

        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                name = ?2,
                type = ?3,
                unit = ?4,
                stock = ?5,
                unit_price = ?6,
                alert_threshold = ?7,
                max_stock_history = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.item_type)
        .bind(&item.unit)
        .bind(item.stock)
        .bind(item.unit_price)
        .bind(item.alert_threshold)
        .bind(item.max_stock_history)
        .bind(item.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", item.id));
        }

        Ok(())
    }

    /// Adds a signed `delta` to stock and raises the high-water mark.
    pub async fn adjust(
        conn: &mut SqliteConnection,
        id: i64,
        delta: f64,
        now: NaiveDateTime,
    ) -> DbResult<()> {
        debug!(id, delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                stock = stock + ?2,
                max_stock_history = MAX(max_stock_history, stock + ?2),
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", id));
        }

        Ok(())
    }

    /// Subtracts `quantity` from the row linked to `product_id`.
    ///
    /// Returns false when the product has no inventory row. No lock check:
    /// a sale that already passed validation always deducts.
    pub async fn deduct_for_product(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: f64,
        now: NaiveDateTime,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                stock = stock - ?2,
                max_stock_history = MAX(max_stock_history, stock - ?2),
                updated_at = ?3
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(conn)
        .await?;

        let deducted = result.rows_affected() > 0;
        debug!(product_id, quantity, deducted, "Deducted stock for sale");
        Ok(deducted)
    }

    /// Removes a row.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id, "Deleting inventory item");

        let result = sqlx::query("DELETE FROM inventory WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", id));
        }

        Ok(())
    }
}

async fn fetch<'e, E>(executor: E, id: i64) -> DbResult<Option<InventoryView>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, InventoryRow>(concat!(select_inventory!(), " WHERE i.id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(InventoryView::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{local_now, Database, DbConfig};
    use rebill_core::{InventoryType, StockStatus};

    fn raw(name: &str, stock: f64, threshold: f64) -> NewInventoryItem {
        NewInventoryItem {
            name: name.to_string(),
            item_type: InventoryType::RawMaterial,
            unit: "kg".to_string(),
            stock,
            unit_price: 5.0,
            alert_threshold: threshold,
            product_id: None,
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_view_derives_status() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = InventoryRepository::insert(&mut conn, &raw("Sugar", 2.0, 3.0), 10.0, local_now())
            .await
            .unwrap();
        drop(conn);

        let view = db.inventory_items().get(id).await.unwrap().unwrap();
        assert_eq!(view.item.item_type, InventoryType::RawMaterial);
        assert_eq!(view.status, StockStatus::LowStock);
        assert!(!view.is_locked);
    }

    #[tokio::test]
    async fn test_adjust_raises_high_water_mark_only() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = InventoryRepository::insert(&mut conn, &raw("Sugar", 8.0, 1.0), 10.0, local_now())
            .await
            .unwrap();

        InventoryRepository::adjust(&mut conn, id, 7.0, local_now()).await.unwrap();
        InventoryRepository::adjust(&mut conn, id, -12.0, local_now()).await.unwrap();
        drop(conn);

        let view = db.inventory_items().get(id).await.unwrap().unwrap();
        assert_eq!(view.item.stock, 3.0);
        assert_eq!(view.item.max_stock_history, 15.0);
    }

    #[tokio::test]
    async fn test_deduct_without_link_is_noop() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let deducted = InventoryRepository::deduct_for_product(&mut conn, "ghost", 1.0, local_now())
            .await
            .unwrap();
        assert!(!deducted);
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        InventoryRepository::insert(&mut conn, &raw("Sugar", 2.0, 3.0), 10.0, local_now())
            .await
            .unwrap();
        InventoryRepository::insert(&mut conn, &raw("Milk", 20.0, 3.0), 20.0, local_now())
            .await
            .unwrap();
        drop(conn);

        let low = db.inventory_items().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].item.name, "Sugar");
        assert_eq!(db.inventory_items().count_low_stock().await.unwrap(), 1);
        assert_eq!(db.inventory_items().list().await.unwrap().len(), 2);
    }
}
