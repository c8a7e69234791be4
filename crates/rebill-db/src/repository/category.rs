//! # Category Repository
//!
//! Database operations for categories.
//!
//! ## Usage Checks
//! A category counts as used when a product links to it now, or when any
//! stored bill line names a product that belongs to it. The second check
//! joins `bill_items` against the current catalog; it is a plain read and
//! never takes the write lock.

use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rebill_core::Category;

macro_rules! select_category {
    () => {
        "SELECT id, name, description, active, created_at, updated_at FROM categories"
    };
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Gets a category by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Category>> {
        fetch_by_id(&self.pool, id).await
    }

    /// Same as [`get`](Self::get), inside the caller's transaction.
    pub async fn get_in_tx(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Category>> {
        fetch_by_id(conn, id).await
    }

    /// Finds a category by exact name, or ignoring ASCII case.
    pub async fn find_by_name(
        &self,
        name: &str,
        case_insensitive: bool,
    ) -> DbResult<Option<Category>> {
        fetch_by_name(&self.pool, name, case_insensitive).await
    }

    /// Same as [`find_by_name`](Self::find_by_name), inside the caller's transaction.
    pub async fn find_by_name_in_tx(
        conn: &mut SqliteConnection,
        name: &str,
        case_insensitive: bool,
    ) -> DbResult<Option<Category>> {
        fetch_by_name(conn, name, case_insensitive).await
    }

    /// Lists categories ordered by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(concat!(
            select_category!(),
            " WHERE active = 1 OR ?1 ORDER BY name"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Inserts a category and returns its id.
    pub async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        description: Option<&str>,
        now: NaiveDateTime,
    ) -> DbResult<i64> {
        debug!(name, "Inserting category");

        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, description, active, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .execute(conn)
        .await
        .map_err(|e| name_conflict(e, name))?;

        Ok(result.last_insert_rowid())
    }

    /// Writes every mutable column of `category`.
    pub async fn update(conn: &mut SqliteConnection, category: &Category) -> DbResult<()> {
        debug!(id = category.id, "Updating category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = ?2,
                description = ?3,
                active = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .bind(category.updated_at)
        .execute(conn)
        .await
        .map_err(|e| name_conflict(e, &category.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", category.id));
        }

        Ok(())
    }

    /// Flips the active flag.
    pub async fn set_active(
        conn: &mut SqliteConnection,
        id: i64,
        active: bool,
        now: NaiveDateTime,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE categories SET active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    /// Removes a category row.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        debug!(id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    /// Products currently linked to the category.
    pub async fn count_products(conn: &mut SqliteConnection, id: i64) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
            .bind(id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    /// Stored bill lines whose product belongs to the category, by id or
    /// by legacy label.
    ///
    /// Cancelled bills count too: they stay in the audit trail.
    pub async fn count_bill_references(
        conn: &mut SqliteConnection,
        id: i64,
        name: &str,
    ) -> DbResult<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bill_items bi
            JOIN products p ON p.product_id = bi.product_id
            WHERE p.category_id = ?1
               OR TRIM(p.category) = ?2 COLLATE NOCASE
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }
}

async fn fetch_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Category>>
where
    E: SqliteExecutor<'e>,
{
    let category = sqlx::query_as::<_, Category>(concat!(select_category!(), " WHERE id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(category)
}

async fn fetch_by_name<'e, E>(
    executor: E,
    name: &str,
    case_insensitive: bool,
) -> DbResult<Option<Category>>
where
    E: SqliteExecutor<'e>,
{
    // The column is declared NOCASE, so plain `=` already ignores case.
    let sql = if case_insensitive {
        concat!(select_category!(), " WHERE name = ?1")
    } else {
        concat!(select_category!(), " WHERE name = ?1 COLLATE BINARY")
    };

    let category = sqlx::query_as::<_, Category>(sql)
        .bind(name.trim())
        .fetch_optional(executor)
        .await?;

    Ok(category)
}

fn name_conflict(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("categories.name", name),
        other => other,
    }
}
