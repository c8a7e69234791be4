//! # rebill-core: Pure Business Logic for Rebill
//!
//! Domain types and pure rules of the POS backend, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rebill Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (browser)                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               rebill-db (services + repositories)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rebill-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │ billing │ │ settings │ │ summary │ │validate│  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Products, categories, inventory, bills, settings
//! - [`billing`] - Bill requests, line snapshots, totals, numbering scope
//! - [`summary`] - Report aggregation over loaded bills
//! - [`settings`] - Recognized keys, defaults, typed accessors
//! - [`validation`] - Input validation
//! - [`error`] - Domain errors and the shared [`ErrorKind`]
//!
//! ## Example Usage
//!
//! ```rust
//! use rebill_core::billing::{bill_total, validate_lines, BillLineRequest};
//!
//! let lines = vec![BillLineRequest::new("A1", 2)];
//! validate_lines(&lines).unwrap();
//! assert_eq!(bill_total(&[]), 0.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod settings;
pub mod summary;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::{BillLineRequest, BillUpdate, NewBill, NumberingScope};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use settings::Settings;
pub use summary::{
    DashboardSummary, DateRange, PeriodProductSummary, ProductSales, QuickStats, SalesSummary,
    TopProduct,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category new products fall back to when the requested one is unknown.
pub const FALLBACK_CATEGORY: &str = "other";

/// Categories seeded on first run.
pub const SEED_CATEGORIES: &[&str] = &["coldrink", "paan", FALLBACK_CATEGORY];
