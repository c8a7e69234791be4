//! # Settings Store
//!
//! Flat key/value configuration with typed reads through
//! [`rebill_core::Settings`].
//!
//! Missing keys are never an error: readers get the caller's default.
//! Bulk upserts are best-effort per key; a failing key is logged and the
//! rest of the batch still lands.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::local_now;
use crate::pool::Database;
use rebill_core::settings::DEFAULT_GROUP;
use rebill_core::validation::validate_setting_key;
use rebill_core::{Setting, SettingEntry, Settings};

/// Key/value settings service.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        SettingsStore { db }
    }

    /// Value of `key`, or `default` when the key is not stored.
    pub async fn get(&self, key: &str, default: &str) -> ServiceResult<String> {
        let value = self.db.setting_entries().get(key).await?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    /// Every stored key with its value.
    pub async fn get_all(&self) -> ServiceResult<BTreeMap<String, String>> {
        let rows = self.db.setting_entries().list().await?;
        Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
    }

    /// Every stored setting with its group and timestamp.
    pub async fn list(&self) -> ServiceResult<Vec<Setting>> {
        Ok(self.db.setting_entries().list().await?)
    }

    /// Typed snapshot of all settings.
    pub async fn snapshot(&self) -> ServiceResult<Settings> {
        Ok(Settings::new(self.get_all().await?))
    }

    /// Whether bill numbers restart each day (default true).
    pub async fn bill_reset_daily(&self) -> ServiceResult<bool> {
        Ok(self.snapshot().await?.bill_reset_daily())
    }

    /// Creates or updates each entry. Returns how many were written.
    ///
    /// Each key is its own write. An invalid key or a failed write is
    /// logged and skipped.
    pub async fn upsert_bulk(&self, entries: &[SettingEntry]) -> ServiceResult<usize> {
        let repo = self.db.setting_entries();
        let now = local_now();
        let mut written = 0;

        for entry in entries {
            if let Err(e) = validate_setting_key(&entry.key) {
                warn!(key = %entry.key, error = %e, "Skipping invalid setting key");
                continue;
            }

            match repo
                .upsert(
                    entry.key.trim(),
                    &entry.value,
                    entry.group_name.as_deref(),
                    DEFAULT_GROUP,
                    now,
                )
                .await
            {
                Ok(()) => written += 1,
                Err(e) => warn!(key = %entry.key, error = %e, "Failed to save setting"),
            }
        }

        info!(written, requested = entries.len(), "Settings updated");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use rebill_core::settings::keys;

    async fn store() -> SettingsStore {
        Database::new(DbConfig::in_memory()).await.unwrap().settings()
    }

    #[tokio::test]
    async fn test_missing_key_returns_default() {
        let settings = store().await;
        assert_eq!(settings.get("unknown_key", "fallback").await.unwrap(), "fallback");
        assert_eq!(settings.get(keys::SHOP_NAME, "x").await.unwrap(), "My Shop");
    }

    #[tokio::test]
    async fn test_bulk_upsert_skips_bad_keys() {
        let settings = store().await;
        let written = settings
            .upsert_bulk(&[
                SettingEntry::new(keys::BILL_RESET_DAILY, "false"),
                SettingEntry::new("   ", "ignored"),
                SettingEntry::new("theme", "dark"),
            ])
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert!(!settings.bill_reset_daily().await.unwrap());
        let all = settings.get_all().await.unwrap();
        assert_eq!(all["theme"], "dark");
        assert!(!all.contains_key("   "));
    }

    #[tokio::test]
    async fn test_snapshot_parses_types() {
        let settings = store().await;
        settings
            .upsert_bulk(&[SettingEntry::new(keys::DEFAULT_TAX_RATE, "5.5")])
            .await
            .unwrap();
        let snapshot = settings.snapshot().await.unwrap();
        assert_eq!(snapshot.default_tax_rate(), 5.5);
        assert!(snapshot.bill_reset_daily());
        assert!(!snapshot.printer_enabled());
    }
}
