//! # Service Module
//!
//! Business operations built from `rebill-core` rules and repository SQL.
//! A service owns the transaction boundary: each public method is one unit
//! of work that commits fully or not at all.
//!
//! ## Services
//!
//! - [`SettingsStore`](settings::SettingsStore) - key/value settings
//! - [`Catalog`](catalog::Catalog) - products and categories
//! - [`InventoryLedger`](inventory::InventoryLedger) - stock rows and locks
//! - [`BillingManager`](billing::BillingManager) - bill lifecycle
//! - [`ReportAggregator`](reports::ReportAggregator) - sales summaries
//!
//! ## Transactions and the Pool
//! Everything a transaction needs from the pool (settings, product rows)
//! is read before `begin()`. While a transaction is open the service only
//! talks to that transaction's connection.

pub mod billing;
pub mod catalog;
pub mod inventory;
pub mod reports;
pub mod settings;
