//! # Catalog
//!
//! Products and categories: lookups used by billing and reports, plus the
//! maintenance operations behind the admin screens.
//!
//! ## Category Deletion
//! ```text
//! delete_category(id)
//!      │
//!      ▼
//! products linked? ──yes──┐
//!      │ no               │
//!      ▼                  ▼
//! bill lines for     mark inactive ──► Deactivated { reason }
//! its products? ─yes─┘
//!      │ no
//!      ▼
//! remove row ──► Removed
//! ```
//! Deleting twice is harmless: the second call deactivates an already
//! inactive category again or reports it missing.

use tracing::{info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::local_now;
use crate::pool::Database;
use crate::repository::bill::BillRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::product::ProductRepository;
use rebill_core::validation::{validate_category_name, validate_price, validate_product_id, validate_product_name};
use rebill_core::{
    Category, CategoryDeletion, CategoryUpdate, CategoryUsage, CoreError, NewCategory, NewProduct,
    Product, ProductDeleteMode, ProductUpdate, FALLBACK_CATEGORY,
};
use sqlx::SqliteConnection;

/// Product and category service.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Product by id, active or not.
    pub async fn get_product(&self, product_id: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    /// Products ordered by name; inactive ones only on request.
    pub async fn list_products(&self, include_inactive: bool) -> ServiceResult<Vec<Product>> {
        Ok(self.db.products().list(include_inactive).await?)
    }

    /// Creates a product.
    ///
    /// Unknown or missing category names land in the fallback category.
    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product_id = input.product_id.trim().to_string();
        validate_product_id(&product_id)?;
        validate_product_name(&input.name)?;
        validate_price(input.price)?;

        let mut tx = self.db.begin_write().await?;
        let (category_id, category) = resolve_category(&mut tx, input.category.as_deref()).await?;

        let now = local_now();
        let product = Product {
            product_id: product_id.clone(),
            name: input.name.trim().to_string(),
            price: input.price,
            category_id,
            category,
            image_filename: input.image_filename,
            active: true,
            created_at: now,
            updated_at: now,
        };

        ProductRepository::insert(&mut tx, &product)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => {
                    ServiceError::from(CoreError::DuplicateProduct(product_id.clone()))
                }
                other => other.into(),
            })?;
        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %product.product_id, price = product.price, "Product created");
        Ok(product)
    }

    /// Applies a partial update. The id never changes.
    pub async fn update_product(
        &self,
        product_id: &str,
        update: ProductUpdate,
    ) -> ServiceResult<Product> {
        if let Some(name) = &update.name {
            validate_product_name(name)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }

        let mut tx = self.db.begin_write().await?;
        let mut product = ProductRepository::get_in_tx(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(label) = update.category {
            let (category_id, category) = resolve_category(&mut tx, Some(&label)).await?;
            product.category_id = category_id;
            product.category = category;
        }
        if let Some(image) = update.image_filename {
            product.image_filename = Some(image).filter(|f| !f.trim().is_empty());
        }
        if let Some(active) = update.active {
            product.active = active;
        }
        product.updated_at = local_now();

        ProductRepository::update(&mut tx, &product).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(product_id, "Product updated");
        Ok(product)
    }

    /// Activates or deactivates a product.
    ///
    /// Deactivating locks a linked direct-sale inventory row.
    pub async fn set_product_active(&self, product_id: &str, active: bool) -> ServiceResult<()> {
        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        ProductRepository::set_active(&mut conn, product_id, active, local_now())
            .await
            .map_err(|e| not_found_as_product(e, product_id))?;

        info!(product_id, active, "Product active flag changed");
        Ok(())
    }

    /// Soft mode deactivates; hard mode removes the row and unlinks its
    /// inventory. Bills keep their snapshots either way.
    pub async fn delete_product(
        &self,
        product_id: &str,
        mode: ProductDeleteMode,
    ) -> ServiceResult<()> {
        match mode {
            ProductDeleteMode::Soft => self.set_product_active(product_id, false).await,
            ProductDeleteMode::Hard => {
                let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
                ProductRepository::delete(&mut conn, product_id)
                    .await
                    .map_err(|e| not_found_as_product(e, product_id))?;
                info!(product_id, "Product removed");
                Ok(())
            }
        }
    }

    /// Removes every bill and then every product in one transaction.
    ///
    /// Returns `(bills, products)` removed. Settings, categories and
    /// inventory rows stay; inventory links fall back to NULL.
    pub async fn clear_bills_and_products(&self) -> ServiceResult<(u64, u64)> {
        let mut tx = self.db.begin_write().await?;
        let bills = BillRepository::delete_all(&mut tx).await?;
        let products = ProductRepository::delete_all(&mut tx).await?;
        tx.commit().await.map_err(DbError::from)?;

        warn!(bills, products, "Bills and products cleared");
        Ok((bills, products))
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn get_category(&self, id: i64) -> ServiceResult<Category> {
        self.db
            .categories()
            .get(id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()).into())
    }

    /// Category by name, exact or ignoring ASCII case.
    pub async fn get_category_by_name(
        &self,
        name: &str,
        case_insensitive: bool,
    ) -> ServiceResult<Category> {
        self.db
            .categories()
            .find_by_name(name, case_insensitive)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(name.to_string()).into())
    }

    pub async fn list_categories(&self, include_inactive: bool) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list(include_inactive).await?)
    }

    /// Creates a category. Names are unique ignoring case.
    pub async fn create_category(&self, input: NewCategory) -> ServiceResult<Category> {
        validate_category_name(&input.name)?;
        let name = input.name.trim();
        let description = input.description.as_deref().map(str::trim).filter(|d| !d.is_empty());

        let mut tx = self.db.begin_write().await?;
        let id = CategoryRepository::insert(&mut tx, name, description, local_now())
            .await
            .map_err(|e| category_conflict(e, name))?;
        let category = CategoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, name, "Category created");
        Ok(category)
    }

    /// Applies a partial update.
    pub async fn update_category(&self, id: i64, update: CategoryUpdate) -> ServiceResult<Category> {
        if let Some(name) = &update.name {
            validate_category_name(name)?;
        }

        let mut tx = self.db.begin_write().await?;
        let mut category = CategoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            let description = description.trim();
            category.description = (!description.is_empty()).then(|| description.to_string());
        }
        if let Some(active) = update.active {
            category.active = active;
        }
        category.updated_at = local_now();

        CategoryRepository::update(&mut tx, &category)
            .await
            .map_err(|e| category_conflict(e, &category.name))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id, "Category updated");
        Ok(category)
    }

    /// Whether products or stored bill lines still point at the category.
    pub async fn is_category_used(&self, id: i64) -> ServiceResult<CategoryUsage> {
        // Read-only transaction: the counts come from one snapshot.
        let mut tx = self.db.begin().await?;
        let category = CategoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        let usage = usage_of(&mut tx, &category).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(usage)
    }

    /// Removes an unused category, deactivates a used one.
    pub async fn delete_category(&self, id: i64) -> ServiceResult<CategoryDeletion> {
        let mut tx = self.db.begin_write().await?;
        let category = CategoryRepository::get_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;

        let usage = usage_of(&mut tx, &category).await?;
        let outcome = if usage.used {
            CategoryRepository::set_active(&mut tx, id, false, local_now()).await?;
            CategoryDeletion::Deactivated {
                reason: usage.reason,
            }
        } else {
            CategoryRepository::delete(&mut tx, id).await?;
            CategoryDeletion::Removed
        };
        tx.commit().await.map_err(DbError::from)?;

        info!(id, name = %category.name, ?outcome, "Category deleted");
        Ok(outcome)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolves a requested category label to `(category_id, label)`.
///
/// Blank or unknown names use the fallback category. Without a fallback
/// row the product keeps the requested text as its legacy label.
async fn resolve_category(
    conn: &mut SqliteConnection,
    requested: Option<&str>,
) -> ServiceResult<(Option<i64>, Option<String>)> {
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());

    if let Some(name) = requested {
        if let Some(category) = CategoryRepository::find_by_name_in_tx(conn, name, true).await? {
            return Ok((Some(category.id), Some(category.name)));
        }
    }

    match CategoryRepository::find_by_name_in_tx(conn, FALLBACK_CATEGORY, true).await? {
        Some(fallback) => Ok((Some(fallback.id), Some(fallback.name))),
        None => Ok((None, requested.map(str::to_string))),
    }
}

async fn usage_of(conn: &mut SqliteConnection, category: &Category) -> ServiceResult<CategoryUsage> {
    let products = CategoryRepository::count_products(conn, category.id).await?;
    if products > 0 {
        return Ok(CategoryUsage {
            used: true,
            reason: format!("{} product(s) are in this category", products),
        });
    }

    let lines = CategoryRepository::count_bill_references(conn, category.id, &category.name).await?;
    if lines > 0 {
        return Ok(CategoryUsage {
            used: true,
            reason: format!("{} bill item(s) reference products of this category", lines),
        });
    }

    Ok(CategoryUsage {
        used: false,
        reason: "Category is not used".to_string(),
    })
}

fn category_conflict(err: DbError, name: &str) -> ServiceError {
    match err {
        DbError::UniqueViolation { .. } => CoreError::DuplicateCategory(name.to_string()).into(),
        other => other.into(),
    }
}

fn not_found_as_product(err: DbError, product_id: &str) -> ServiceError {
    match err {
        DbError::NotFound { .. } => CoreError::ProductNotFound(product_id.to_string()).into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use rebill_core::ErrorKind;

    async fn catalog() -> Catalog {
        Database::new(DbConfig::in_memory()).await.unwrap().catalog()
    }

    fn new_product(id: &str, category: Option<&str>) -> NewProduct {
        NewProduct {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            price: 25.0,
            category: category.map(str::to_string),
            image_filename: None,
        }
    }

    #[tokio::test]
    async fn test_create_resolves_category_case_insensitively() {
        let catalog = catalog().await;
        let product = catalog
            .create_product(new_product("A1", Some("COLDRINK")))
            .await
            .unwrap();
        let coldrink = catalog.get_category_by_name("coldrink", false).await.unwrap();
        assert_eq!(product.category_id, Some(coldrink.id));
        assert_eq!(product.category.as_deref(), Some("coldrink"));
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back() {
        let catalog = catalog().await;
        let product = catalog
            .create_product(new_product("A1", Some("drinks")))
            .await
            .unwrap();
        assert_eq!(product.category.as_deref(), Some(FALLBACK_CATEGORY));
    }

    #[tokio::test]
    async fn test_duplicate_product_is_conflict() {
        let catalog = catalog().await;
        catalog.create_product(new_product("A1", None)).await.unwrap();
        let err = catalog.create_product(new_product("A1", None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_invalid_price_rejected_before_write() {
        let catalog = catalog().await;
        let mut input = new_product("A1", None);
        input.price = 0.0;
        let err = catalog.create_product(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(catalog.list_products(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_and_hard_delete() {
        let catalog = catalog().await;
        catalog.create_product(new_product("S1", None)).await.unwrap();
        catalog.create_product(new_product("H1", None)).await.unwrap();

        catalog.delete_product("S1", ProductDeleteMode::Soft).await.unwrap();
        catalog.delete_product("H1", ProductDeleteMode::Hard).await.unwrap();

        assert!(!catalog.get_product("S1").await.unwrap().active);
        assert_eq!(
            catalog.get_product("H1").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(catalog.list_products(false).await.unwrap().is_empty());
        assert_eq!(catalog.list_products(true).await.unwrap().len(), 1);

        let err = catalog
            .delete_product("H1", ProductDeleteMode::Hard)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_product_changes_fields() {
        let catalog = catalog().await;
        catalog.create_product(new_product("A1", None)).await.unwrap();
        let updated = catalog
            .update_product(
                "A1",
                ProductUpdate {
                    name: Some("Gadget".to_string()),
                    price: Some(20.0),
                    category: Some("paan".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.price, 20.0);
        assert_eq!(updated.category.as_deref(), Some("paan"));

        let err = catalog
            .update_product(
                "A1",
                ProductUpdate {
                    price: Some(-1.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_category_crud_and_duplicate_names() {
        let catalog = catalog().await;
        let snacks = catalog
            .create_category(NewCategory {
                name: "Snacks".to_string(),
                description: Some("Chips".to_string()),
            })
            .await
            .unwrap();
        assert!(snacks.active);

        let err = catalog
            .create_category(NewCategory {
                name: "SNACKS".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renamed = catalog
            .update_category(
                snacks.id,
                CategoryUpdate {
                    name: Some("Namkeen".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Namkeen");
        assert_eq!(catalog.get_category(snacks.id).await.unwrap().name, "Namkeen");
    }

    #[tokio::test]
    async fn test_delete_unused_category_removes_it() {
        let catalog = catalog().await;
        let snacks = catalog
            .create_category(NewCategory {
                name: "snacks".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let usage = catalog.is_category_used(snacks.id).await.unwrap();
        assert!(!usage.used);
        assert_eq!(
            catalog.delete_category(snacks.id).await.unwrap(),
            CategoryDeletion::Removed
        );
        assert_eq!(
            catalog.get_category(snacks.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_category_with_products_deactivates() {
        let catalog = catalog().await;
        catalog.create_product(new_product("P1", Some("paan"))).await.unwrap();
        let paan = catalog.get_category_by_name("paan", true).await.unwrap();

        let outcome = catalog.delete_category(paan.id).await.unwrap();
        assert!(matches!(outcome, CategoryDeletion::Deactivated { .. }));
        assert!(!catalog.get_category(paan.id).await.unwrap().active);

        // Repeating the delete is harmless.
        let again = catalog.delete_category(paan.id).await.unwrap();
        assert!(matches!(again, CategoryDeletion::Deactivated { .. }));
    }

    #[tokio::test]
    async fn test_bill_history_keeps_category_in_use() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let snacks = catalog
            .create_category(NewCategory {
                name: "snacks".to_string(),
                description: None,
            })
            .await
            .unwrap();
        catalog.create_product(new_product("C1", Some("snacks"))).await.unwrap();
        db.billing()
            .create_bill(rebill_core::NewBill::cash(vec![rebill_core::BillLineRequest::new(
                "C1", 1,
            )]))
            .await
            .unwrap();

        // A row that predates category ids keeps only the label.
        sqlx::query("UPDATE products SET category_id = NULL WHERE product_id = 'C1'")
            .execute(db.pool())
            .await
            .unwrap();

        let usage = catalog.is_category_used(snacks.id).await.unwrap();
        assert!(usage.used);
        assert!(usage.reason.contains("bill item"));

        let outcome = catalog.delete_category(snacks.id).await.unwrap();
        assert!(matches!(outcome, CategoryDeletion::Deactivated { .. }));
    }

    #[tokio::test]
    async fn test_clear_bills_and_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog.create_product(new_product("A1", None)).await.unwrap();
        catalog.create_product(new_product("A2", None)).await.unwrap();
        db.billing()
            .create_bill(rebill_core::NewBill::cash(vec![rebill_core::BillLineRequest::new(
                "A1", 1,
            )]))
            .await
            .unwrap();

        assert_eq!(catalog.clear_bills_and_products().await.unwrap(), (1, 2));
        assert!(catalog.list_products(true).await.unwrap().is_empty());
        assert!(db.billing().all_bills().await.unwrap().is_empty());
        assert!(!catalog.list_categories(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_bills() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog.create_product(new_product("A1", None)).await.unwrap();
        db.billing()
            .create_bill(rebill_core::NewBill::cash(vec![rebill_core::BillLineRequest::new(
                "A1", 1,
            )]))
            .await
            .unwrap();

        // Product deletes fail after the bills are already gone in the same transaction.
        sqlx::query(
            "CREATE TRIGGER keep_products BEFORE DELETE ON products \
             BEGIN SELECT RAISE(ABORT, 'products are pinned'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = catalog.clear_bills_and_products().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalFailure);
        assert_eq!(db.billing().all_bills().await.unwrap().len(), 1);
        assert_eq!(catalog.list_products(true).await.unwrap().len(), 1);
    }
}
