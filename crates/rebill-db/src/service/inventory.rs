//! # Inventory Ledger
//!
//! Stock rows, their lock rule and the deduction hook used by billing.
//!
//! ## Lock Rule
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ type == DIRECT_SALE  AND  product_id set  AND  product inactive │
//! │                              │                                   │
//! │                              ▼                                   │
//! │                      row is LOCKED                               │
//! │                                                                  │
//! │   update / adjust / delete  ──►  CoreError::InventoryLocked      │
//! │   deduct (bill creation)    ──►  always applied                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is checked and the write applied inside one transaction, so a
//! product deactivated concurrently either blocks the edit or comes after it.

use chrono::NaiveDateTime;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::local_now;
use crate::pool::Database;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use rebill_core::validation::{validate_inventory_labels, validate_non_negative, validate_stock};
use rebill_core::{
    next_stock_history, CoreError, InventoryUpdate, InventoryView, NewInventoryItem,
    MIN_STOCK_HISTORY,
};

/// Inventory service.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Database,
}

impl InventoryLedger {
    pub fn new(db: Database) -> Self {
        InventoryLedger { db }
    }

    /// Row with derived status and lock flag.
    pub async fn get(&self, id: i64) -> ServiceResult<InventoryView> {
        self.db
            .inventory_items()
            .get(id)
            .await?
            .ok_or_else(|| CoreError::InventoryNotFound(id).into())
    }

    /// All rows ordered by name.
    pub async fn list(&self) -> ServiceResult<Vec<InventoryView>> {
        Ok(self.db.inventory_items().list().await?)
    }

    /// Rows at or below their alert threshold.
    pub async fn low_stock(&self) -> ServiceResult<Vec<InventoryView>> {
        Ok(self.db.inventory_items().low_stock().await?)
    }

    /// Creates a row, optionally linked to an active product.
    ///
    /// The high-water mark starts at `max(stock, 10)`.
    pub async fn create(&self, input: NewInventoryItem) -> ServiceResult<InventoryView> {
        validate_inventory_labels(&input.name, &input.unit)?;
        validate_stock(input.stock)?;
        validate_non_negative("unit_price", input.unit_price)?;
        validate_non_negative("alert_threshold", input.alert_threshold)?;

        let input = NewInventoryItem {
            name: input.name.trim().to_string(),
            unit: input.unit.trim().to_string(),
            product_id: input
                .product_id
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            ..input
        };

        let mut tx = self.db.begin_write().await?;

        if let Some(product_id) = &input.product_id {
            let product = ProductRepository::get_in_tx(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
            if !product.active {
                return Err(CoreError::ProductInactive(product_id.clone()).into());
            }
            if let Some(existing) = InventoryRepository::find_by_product_in_tx(&mut tx, product_id).await? {
                return Err(CoreError::ProductAlreadyLinked {
                    product_id: product_id.clone(),
                    inventory_id: existing,
                }
                .into());
            }
        }

        let max_stock_history = next_stock_history(MIN_STOCK_HISTORY, input.stock);
        let id = InventoryRepository::insert(&mut tx, &input, max_stock_history, local_now()).await?;
        let view = InventoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory", id))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, name = %view.item.name, product_id = ?view.item.product_id, "Inventory item created");
        Ok(view)
    }

    /// Applies a partial update to an unlocked row.
    ///
    /// A new stock figure raises the high-water mark when it exceeds it.
    pub async fn update(&self, id: i64, update: InventoryUpdate) -> ServiceResult<InventoryView> {
        if let Some(stock) = update.stock {
            validate_stock(stock)?;
        }
        if let Some(price) = update.unit_price {
            validate_non_negative("unit_price", price)?;
        }
        if let Some(threshold) = update.alert_threshold {
            validate_non_negative("alert_threshold", threshold)?;
        }

        let mut tx = self.db.begin_write().await?;
        let mut item = load_unlocked(&mut tx, id).await?.item;

        if let Some(name) = update.name {
            item.name = name.trim().to_string();
        }
        if let Some(unit) = update.unit {
            item.unit = unit.trim().to_string();
        }
        validate_inventory_labels(&item.name, &item.unit)?;
        if let Some(item_type) = update.item_type {
            item.item_type = item_type;
        }
        if let Some(stock) = update.stock {
            item.stock = stock;
            item.max_stock_history = next_stock_history(item.max_stock_history, stock);
        }
        if let Some(price) = update.unit_price {
            item.unit_price = price;
        }
        if let Some(threshold) = update.alert_threshold {
            item.alert_threshold = threshold;
        }
        item.updated_at = local_now();

        InventoryRepository::update(&mut tx, &item).await?;
        let view = InventoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or(CoreError::InventoryNotFound(id))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, "Inventory item updated");
        Ok(view)
    }

    /// Adds a signed `delta` to stock of an unlocked row.
    pub async fn adjust(&self, id: i64, delta: f64) -> ServiceResult<InventoryView> {
        validate_stock(delta)?;

        let mut tx = self.db.begin_write().await?;
        load_unlocked(&mut tx, id).await?;
        InventoryRepository::adjust(&mut tx, id, delta, local_now()).await?;
        let view = InventoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or(CoreError::InventoryNotFound(id))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, delta, stock = view.item.stock, "Stock adjusted");
        Ok(view)
    }

    /// Removes an unlocked row.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let mut tx = self.db.begin_write().await?;
        load_unlocked(&mut tx, id).await?;
        InventoryRepository::delete(&mut tx, id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, "Inventory item deleted");
        Ok(())
    }

    /// Deducts a sold quantity from the row linked to `product_id`.
    ///
    /// Runs inside the caller's transaction and skips the lock check.
    /// Unlinked products are a no-op; returns whether a row was touched.
    pub async fn deduct(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        now: NaiveDateTime,
    ) -> ServiceResult<bool> {
        Ok(InventoryRepository::deduct_for_product(conn, product_id, quantity as f64, now).await?)
    }
}

async fn load_unlocked(conn: &mut SqliteConnection, id: i64) -> ServiceResult<InventoryView> {
    let view = InventoryRepository::get_in_tx(conn, id)
        .await?
        .ok_or(CoreError::InventoryNotFound(id))?;

    if view.is_locked {
        return Err(ServiceError::from(CoreError::InventoryLocked { id }));
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use rebill_core::{ErrorKind, InventoryType, NewProduct, StockStatus};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn add_product(db: &Database, id: &str) {
        db.catalog()
            .create_product(NewProduct {
                product_id: id.to_string(),
                name: format!("Product {}", id),
                price: 25.0,
                category: None,
                image_filename: None,
            })
            .await
            .unwrap();
    }

    fn linked(product_id: &str, stock: f64, threshold: f64) -> NewInventoryItem {
        NewInventoryItem {
            name: format!("Stock {}", product_id),
            item_type: InventoryType::DirectSale,
            unit: "pcs".to_string(),
            stock,
            unit_price: 10.0,
            alert_threshold: threshold,
            product_id: Some(product_id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_sets_high_water_floor() {
        let db = setup().await;
        add_product(&db, "A1").await;
        add_product(&db, "B1").await;

        let small = db.ledger().create(linked("A1", 4.0, 1.0)).await.unwrap();
        assert_eq!(small.item.max_stock_history, 10.0);

        let big = db.ledger().create(linked("B1", 40.0, 1.0)).await.unwrap();
        assert_eq!(big.item.max_stock_history, 40.0);
        assert_eq!(big.status, StockStatus::InStock);
    }

    #[tokio::test]
    async fn test_create_link_conflicts() {
        let db = setup().await;
        add_product(&db, "A1").await;
        let first = db.ledger().create(linked("A1", 5.0, 1.0)).await.unwrap();

        let err = db.ledger().create(linked("A1", 5.0, 1.0)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::ProductAlreadyLinked { inventory_id, .. })
                if inventory_id == first.item.id
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = db.ledger().create(linked("ghost", 5.0, 1.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        add_product(&db, "OFF").await;
        db.catalog().set_product_active("OFF", false).await.unwrap();
        let err = db.ledger().create(linked("OFF", 5.0, 1.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_locked_row_rejects_edits() {
        let db = setup().await;
        add_product(&db, "A1").await;
        let row = db.ledger().create(linked("A1", 5.0, 1.0)).await.unwrap();
        db.catalog().set_product_active("A1", false).await.unwrap();

        let view = db.ledger().get(row.item.id).await.unwrap();
        assert!(view.is_locked);

        let ledger = db.ledger();
        let adjust = ledger.adjust(row.item.id, 3.0).await.unwrap_err();
        let update = ledger
            .update(row.item.id, InventoryUpdate {
                stock: Some(1.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        let delete = ledger.delete(row.item.id).await.unwrap_err();
        for err in [adjust, update, delete] {
            assert_eq!(err.kind(), ErrorKind::Locked);
        }

        // Deduction ignores the lock.
        let mut tx = db.begin().await.unwrap();
        assert!(InventoryLedger::deduct(&mut tx, "A1", 2, local_now()).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(ledger.get(row.item.id).await.unwrap().item.stock, 3.0);
    }

    #[tokio::test]
    async fn test_update_and_adjust_track_high_water_mark() {
        let db = setup().await;
        let row = db
            .ledger()
            .create(NewInventoryItem {
                name: "Sugar".to_string(),
                item_type: InventoryType::RawMaterial,
                unit: "kg".to_string(),
                stock: 5.0,
                unit_price: 40.0,
                alert_threshold: 2.0,
                product_id: None,
            })
            .await
            .unwrap();

        let ledger = db.ledger();
        let updated = ledger
            .update(row.item.id, InventoryUpdate {
                stock: Some(25.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.item.max_stock_history, 25.0);

        let adjusted = ledger.adjust(row.item.id, -24.0).await.unwrap();
        assert_eq!(adjusted.item.stock, 1.0);
        assert_eq!(adjusted.item.max_stock_history, 25.0);
        assert_eq!(adjusted.status, StockStatus::LowStock);

        let err = ledger.adjust(999, 1.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adjusts_all_land() {
        use rebill_core::{BillLineRequest, NewBill};

        let path = std::env::temp_dir().join(format!("rebill-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        add_product(&db, "A1").await;
        let sold = db.ledger().create(linked("A1", 100.0, 5.0)).await.unwrap();
        let raw = db
            .ledger()
            .create(NewInventoryItem {
                name: "Betel leaves".to_string(),
                item_type: InventoryType::RawMaterial,
                unit: "pcs".to_string(),
                stock: 0.0,
                unit_price: 2.0,
                alert_threshold: 5.0,
                product_id: None,
            })
            .await
            .unwrap();

        // Stock edits overlap with sales that deduct from another row.
        let adjusts: Vec<_> = (0..20)
            .map(|_| {
                let ledger = db.ledger();
                let id = raw.item.id;
                tokio::spawn(async move { ledger.adjust(id, 1.0).await.map(|_| ()) })
            })
            .collect();
        let sales: Vec<_> = (0..10)
            .map(|_| {
                let billing = db.billing();
                tokio::spawn(async move {
                    billing
                        .create_bill(NewBill::cash(vec![BillLineRequest::new("A1", 1)]))
                        .await
                        .map(|_| ())
                })
            })
            .collect();

        for handle in adjusts.into_iter().chain(sales) {
            handle.await.unwrap().unwrap();
        }

        let raw = db.ledger().get(raw.item.id).await.unwrap();
        assert_eq!(raw.item.stock, 20.0);
        assert_eq!(raw.item.max_stock_history, 20.0);
        assert_eq!(db.ledger().get(sold.item.id).await.unwrap().item.stock, 90.0);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
