//! # rebill-db: Database Layer for Rebill
//!
//! SQLite persistence and the transactional services of the POS backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Database Layer                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                       Services                                  │   │
//! │  │  SettingsStore  Catalog  InventoryLedger  BillingManager        │   │
//! │  │  ReportAggregator                                               │   │
//! │  │  (business rules from rebill-core + transaction boundaries)     │   │
//! │  └───────────────────────────────┬─────────────────────────────────┘   │
//! │                                  │                                      │
//! │  ┌───────────────────────────────▼─────────────────────────────────┐   │
//! │  │                      Repositories                               │   │
//! │  │  ProductRepo  CategoryRepo  InventoryRepo  BillRepo  SettingsRepo│  │
//! │  │  (SQL only)                                                     │   │
//! │  └───────────────────────────────┬─────────────────────────────────┘   │
//! │                                  │                                      │
//! │  ┌───────────────────────────────▼─────────────────────────────────┐   │
//! │  │                    SQLite Database (WAL)                        │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌───────┐ ┌──────────┐ │   │
//! │  │  │categories│ │ products │ │ inventory │ │ bills │ │ settings │ │   │
//! │  │  └──────────┘ └──────────┘ └───────────┘ └───┬───┘ └──────────┘ │   │
//! │  │                                          bill_items             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use rebill_db::{Database, DbConfig};
//! use rebill_core::{BillLineRequest, NewBill};
//!
//! let db = Database::new(DbConfig::new("rebill.db")).await?;
//! let bill = db
//!     .billing()
//!     .create_bill(NewBill::cash(vec![BillLineRequest::new("A1", 2)]))
//!     .await?;
//! println!("Bill #{} total {}", bill.bill_no, bill.total_amount);
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

pub use repository::bill::{BillFilter, BillRepository};
pub use repository::category::CategoryRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::settings::SettingsRepository;

pub use service::billing::BillingManager;
pub use service::catalog::Catalog;
pub use service::inventory::InventoryLedger;
pub use service::reports::ReportAggregator;
pub use service::settings::SettingsStore;

use chrono::NaiveDateTime;

/// Shop wall-clock time, the timestamp stored on every row.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
