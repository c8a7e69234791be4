//! # Repository Module
//!
//! One repository per table family. Repositories hold SQL and nothing else:
//! no business rules, no transaction boundaries of their own.
//!
//! ## Reads vs Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads outside a transaction       Writes (and reads inside one)        │
//! │  ───────────────────────────       ───────────────────────────────      │
//! │  db.products().get("A1")           let mut tx = db.begin().await?;      │
//! │       │                            ProductRepository::insert(           │
//! │       │  &SqlitePool                   &mut tx, &product).await?;       │
//! │       ▼                            tx.commit().await?;                  │
//! │  any pooled connection                  │                               │
//! │                                         │  &mut SqliteConnection        │
//! │                                         ▼                               │
//! │                                    the caller's transaction             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation takes the caller's connection explicitly, so the service
//! decides what runs in one unit of work.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository)
//! - [`CategoryRepository`](category::CategoryRepository)
//! - [`InventoryRepository`](inventory::InventoryRepository)
//! - [`BillRepository`](bill::BillRepository)
//! - [`SettingsRepository`](settings::SettingsRepository)

pub mod bill;
pub mod category;
pub mod inventory;
pub mod product;
pub mod settings;
