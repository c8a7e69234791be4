//! # Settings Facade
//!
//! Settings are stored as plain strings so unknown keys survive upgrades.
//! This module owns the recognized keys, their defaults, and the typed
//! accessors that parse values at the boundary.
//!
//! ```text
//!   settings table              Settings (this module)          callers
//!  ┌──────────────────────┐    ┌──────────────────────────┐
//!  │ bill_reset_daily=true│───►│ get_bool("bill_reset_…") │───► BillingManager
//!  │ default_tax_rate=5   │───►│ get_f64("default_tax…")  │───► receipts
//!  │ shop_name=…          │───►│ get("shop_name")         │
//!  └──────────────────────┘    └──────────────────────────┘
//! ```

use std::collections::BTreeMap;

/// Recognized setting keys.
pub mod keys {
    pub const BILL_RESET_DAILY: &str = "bill_reset_daily";
    pub const DEFAULT_TAX_RATE: &str = "default_tax_rate";
    pub const PRINTER_ENABLED: &str = "printer_enabled";
    pub const SHOP_NAME: &str = "shop_name";
    pub const SHOP_ADDRESS: &str = "shop_address";
    pub const SHOP_PHONE: &str = "shop_phone";
    pub const CURRENCY_SYMBOL: &str = "currency_symbol";
    pub const RECEIPT_FOOTER: &str = "receipt_footer";
}

/// Group assigned when an upsert does not name one.
pub const DEFAULT_GROUP: &str = "app";

/// `(key, value, group)` seeded on first run.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    (keys::BILL_RESET_DAILY, "true", "billing"),
    (keys::DEFAULT_TAX_RATE, "0", "billing"),
    (keys::PRINTER_ENABLED, "false", "printer"),
    (keys::SHOP_NAME, "My Shop", "shop"),
    (keys::SHOP_ADDRESS, "", "shop"),
    (keys::SHOP_PHONE, "", "shop"),
    (keys::CURRENCY_SYMBOL, "Rs.", "shop"),
    (keys::RECEIPT_FOOTER, "Thank you! Visit again", "printer"),
];

/// Default value for a recognized key.
pub fn default_value(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, v, _)| *v)
}

/// Parses the boolean spellings the frontend has historically written.
///
/// Returns `None` for anything unrecognized so the caller's default wins.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read-only typed view over a settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Settings { values }
    }

    /// Raw value, if stored.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stored value, else `default`.
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.raw(key).unwrap_or(default)
    }

    /// Boolean value; unparseable or missing falls back to `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.raw(key).and_then(parse_bool).unwrap_or(default)
    }

    /// Numeric value; unparseable or missing falls back to `default`.
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.raw(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// Whether bill numbers restart every day. Defaults to true.
    pub fn bill_reset_daily(&self) -> bool {
        self.get_bool(keys::BILL_RESET_DAILY, true)
    }

    pub fn printer_enabled(&self) -> bool {
        self.get_bool(keys::PRINTER_ENABLED, false)
    }

    pub fn default_tax_rate(&self) -> f64 {
        self.get_f64(keys::DEFAULT_TAX_RATE, 0.0)
    }

    /// Shop-facing text with the seeded default as fallback.
    pub fn text(&self, key: &str) -> String {
        self.raw(key)
            .or_else(|| default_value(key))
            .unwrap_or_default()
            .to_string()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        Settings::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_reset_daily_defaults_to_true() {
        assert!(Settings::default().bill_reset_daily());
        assert!(settings(&[(keys::BILL_RESET_DAILY, "garbage")]).bill_reset_daily());
        assert!(!settings(&[(keys::BILL_RESET_DAILY, "False")]).bill_reset_daily());
    }

    #[test]
    fn test_get_f64() {
        let s = settings(&[(keys::DEFAULT_TAX_RATE, " 5.5 "), ("bad", "abc")]);
        assert_eq!(s.default_tax_rate(), 5.5);
        assert_eq!(s.get_f64("bad", 1.0), 1.0);
        assert_eq!(s.get_f64("missing", 2.0), 2.0);
    }

    #[test]
    fn test_text_falls_back_to_seed_default() {
        let s = settings(&[]);
        assert_eq!(s.text(keys::SHOP_NAME), "My Shop");
        assert_eq!(s.text("unknown_key"), "");
        assert_eq!(s.get("unknown_key", "x"), "x");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
