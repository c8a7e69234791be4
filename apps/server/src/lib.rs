//! # Rebill Server
//!
//! REST API for the shop frontend.
//!
//! ## Module Organization
//! ```text
//! rebill_server/
//! ├── lib.rs          ◄─── Router assembly
//! ├── main.rs         ◄─── Startup, tracing, graceful shutdown
//! ├── config.rs       ◄─── ServerConfig (file + REBILL_* env)
//! ├── error.rs        ◄─── ApiError → HTTP status + JSON body
//! ├── state.rs        ◄─── AppState shared by handlers
//! ├── printer.rs      ◄─── Receipt rendering and printer seam
//! └── routes/         ◄─── One module per resource
//! ```
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP request                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  axum Router ──► handler(State<AppState>, Path, Query, Json)            │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │              state.db.billing() / catalog() / ledger() / reports()      │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │              Result<Json<T>, ApiError> ──► response                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod printer;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
