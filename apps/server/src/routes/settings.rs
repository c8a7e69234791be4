//! Settings endpoints.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rebill_core::SettingEntry;

use crate::error::ApiResult;
use crate::state::AppState;

/// Body of `PUT /settings`.
///
/// ```json
/// [{ "key": "shop_name", "value": "Corner Shop", "group_name": "shop" }]
/// ```
/// or the flat form the settings screen sends:
/// ```json
/// { "shop_name": "Corner Shop", "printer_enabled": true }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingsPayload {
    List(Vec<SettingEntry>),
    Map(BTreeMap<String, Value>),
}

impl SettingsPayload {
    pub fn into_entries(self) -> Vec<SettingEntry> {
        match self {
            SettingsPayload::List(entries) => entries,
            SettingsPayload::Map(map) => map
                .into_iter()
                .map(|(key, value)| SettingEntry::new(key, value_text(value)))
                .collect(),
        }
    }
}

/// Strings are stored bare; everything else as its JSON text.
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SettingsUpdated {
    pub updated: usize,
}

/// `GET /settings`
pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.db.settings().get_all().await?))
}

/// `PUT /settings`
pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<SettingsPayload>, JsonRejection>,
) -> ApiResult<Json<SettingsUpdated>> {
    let Json(payload) = payload?;
    let updated = state.db.settings().upsert_bulk(&payload.into_entries()).await?;
    Ok(Json(SettingsUpdated { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::state;
    use serde_json::json;

    #[test]
    fn test_both_payload_shapes() {
        let list: SettingsPayload =
            serde_json::from_value(json!([{ "key": "shop_name", "value": "Corner", "group_name": "shop" }]))
                .unwrap();
        let entries = list.into_entries();
        assert_eq!(entries[0].group_name.as_deref(), Some("shop"));

        let map: SettingsPayload =
            serde_json::from_value(json!({ "printer_enabled": true, "default_tax_rate": 5, "shop_name": "Corner" }))
                .unwrap();
        let entries = map.into_entries();
        let value = |key: &str| entries.iter().find(|e| e.key == key).unwrap().value.clone();
        assert_eq!(value("printer_enabled"), "true");
        assert_eq!(value("default_tax_rate"), "5");
        assert_eq!(value("shop_name"), "Corner");
    }

    #[tokio::test]
    async fn test_update_then_read() {
        let state = state().await;
        let payload = SettingsPayload::Map(
            [("shop_name".to_string(), Value::from("Corner Shop"))]
                .into_iter()
                .collect(),
        );
        let Json(result) = update(State(state.clone()), Ok(Json(payload))).await.unwrap();
        assert_eq!(result.updated, 1);

        let Json(all) = get_all(State(state)).await.unwrap();
        assert_eq!(all["shop_name"], "Corner Shop");
        assert_eq!(all["bill_reset_daily"], "true");
    }
}
