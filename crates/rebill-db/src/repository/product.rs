//! # Product Repository
//!
//! Database operations for products.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rebill_core::Product;

macro_rules! select_product {
    () => {
        "SELECT product_id, name, price, category_id, category, image_filename, \
         active, created_at, updated_at FROM products"
    };
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by id, active or not.
    pub async fn get(&self, product_id: &str) -> DbResult<Option<Product>> {
        fetch(&self.pool, product_id).await
    }

    /// Same as [`get`](Self::get), inside the caller's transaction.
    pub async fn get_in_tx(
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Option<Product>> {
        fetch(conn, product_id).await
    }

    /// Lists products ordered by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(concat!(
            select_product!(),
            " WHERE active = 1 OR ?1 ORDER BY name COLLATE NOCASE, product_id"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Current category label of every product, including inactive ones.
    ///
    /// The linked category's name wins over the legacy free-text label.
    /// Products with neither are left out.
    pub async fn category_labels(&self) -> DbResult<HashMap<String, String>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.product_id, COALESCE(c.name, NULLIF(TRIM(p.category), ''))
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, label)| label.map(|l| (id, l)))
            .collect())
    }

    /// Inserts a product.
    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.product_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                product_id, name, price, category_id, category,
                image_filename, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.category_id)
        .bind(&product.category)
        .bind(&product.image_filename)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.product_id.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Writes every mutable column of `product`.
    pub async fn update(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.product_id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                price = ?3,
                category_id = ?4,
                category = ?5,
                image_filename = ?6,
                active = ?7,
                updated_at = ?8
            WHERE product_id = ?1
            "#,
        )
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.category_id)
        .bind(&product.category)
        .bind(&product.image_filename)
        .bind(product.active)
        .bind(product.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.product_id));
        }

        Ok(())
    }

    /// Flips the active flag.
    pub async fn set_active(
        conn: &mut SqliteConnection,
        product_id: &str,
        active: bool,
        now: NaiveDateTime,
    ) -> DbResult<()> {
        debug!(product_id, active, "Setting product active flag");

        let result =
            sqlx::query("UPDATE products SET active = ?2, updated_at = ?3 WHERE product_id = ?1")
                .bind(product_id)
                .bind(active)
                .bind(now)
                .execute(conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Removes a product row. Linked inventory is unlinked by the schema.
    pub async fn delete(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
        debug!(product_id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE product_id = ?1")
            .bind(product_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Removes every product. Returns the number of rows removed.
    pub async fn delete_all(conn: &mut SqliteConnection) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM products").execute(conn).await?;
        debug!(removed = result.rows_affected(), "Deleted all products");
        Ok(result.rows_affected())
    }
}

async fn fetch<'e, E>(executor: E, product_id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let product = sqlx::query_as::<_, Product>(concat!(select_product!(), " WHERE product_id = ?1"))
        .bind(product_id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}
