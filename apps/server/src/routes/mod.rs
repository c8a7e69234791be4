//! # HTTP Routes
//!
//! Every handler follows the same pattern: extract, call one service,
//! wrap the result in `Json`. Business rules live in `rebill-db`.
//!
//! ```text
//! /api
//! ├── /health
//! ├── /products            products.rs
//! ├── /categories          categories.rs
//! ├── /inventory           inventory.rs
//! ├── /bills               bills.rs
//! ├── /settings            settings.rs
//! ├── /summary             summary.rs
//! └── /reset-database      admin.rs (also /bills/clear)
//! ```

pub mod admin;
pub mod bills;
pub mod categories;
pub mod inventory;
pub mod products;
pub mod settings;
pub mod summary;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Message {
            message: message.into(),
        })
    }
}

/// `?include_inactive=true` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub database: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = state.db.health_check().await;
    Json(Health {
        status: if database { "ok" } else { "degraded" }.to_string(),
        database,
    })
}

/// Builds the `/api` router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        // Products
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{product_id}",
            get(products::get_one)
                .put(products::update)
                .delete(products::delete),
        )
        // Categories
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get_one)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/categories/{id}/usage", get(categories::usage))
        // Inventory
        .route("/inventory", get(inventory::list).post(inventory::create))
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route(
            "/inventory/{id}",
            get(inventory::get_one)
                .put(inventory::update)
                .delete(inventory::delete),
        )
        .route("/inventory/{id}/adjust", post(inventory::adjust))
        // Bills
        .route("/bills", get(bills::list).post(bills::create))
        .route("/bills/today", get(bills::today))
        .route("/bills/next-number", get(bills::next_number))
        .route("/bills/all", get(bills::all))
        .route("/bills/clear", post(admin::clear_bills))
        .route("/bills/{bill_no}", get(bills::get_one).put(bills::update))
        .route("/bills/{bill_no}/cancel", post(bills::cancel))
        .route("/bills/{bill_no}/print", post(bills::reprint))
        // Settings
        .route("/settings", get(settings::get_all).put(settings::update))
        // Summaries
        .route("/summary", get(summary::for_dates))
        .route("/summary/today", get(summary::today))
        .route("/summary/dashboard", get(summary::dashboard))
        .route("/summary/top-products", get(summary::top_products))
        .route("/summary/weekly", get(summary::weekly))
        .route("/summary/monthly", get(summary::monthly))
        .route("/summary/quick-stats", get(summary::quick_stats))
        // Admin
        .route("/reset-database", post(admin::reset_database))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .route("/", get(root))
}

async fn root() -> Json<Message> {
    Message::new("Rebill API")
}
