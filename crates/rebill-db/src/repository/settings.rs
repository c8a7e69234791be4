//! # Settings Repository
//!
//! Key/value rows. Values are stored as text and never parsed here.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use rebill_core::Setting;

/// Repository for settings database operations.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Raw value of `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Every stored setting ordered by group, then key.
    pub async fn list(&self) -> DbResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, group_name, updated_at FROM settings ORDER BY group_name, key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(settings)
    }

    /// Creates or replaces one setting.
    ///
    /// A missing `group_name` keeps the stored group, or `default_group`
    /// for a new key.
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
        group_name: Option<&str>,
        default_group: &str,
        now: NaiveDateTime,
    ) -> DbResult<()> {
        debug!(key, "Upserting setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, group_name, updated_at)
            VALUES (?1, ?2, COALESCE(?3, ?4), ?5)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                group_name = COALESCE(?3, settings.group_name),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(group_name)
        .bind(default_group)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
