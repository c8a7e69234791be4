//! Shared application state.

use std::sync::Arc;

use rebill_db::Database;

use crate::config::ServerConfig;
use crate::printer::{LogPrinter, ReceiptPrinter};

/// Handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub printer: Arc<dyn ReceiptPrinter>,
}

impl AppState {
    /// State with the log printer.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState::with_printer(db, config, Arc::new(LogPrinter))
    }

    pub fn with_printer(
        db: Database,
        config: ServerConfig,
        printer: Arc<dyn ReceiptPrinter>,
    ) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            printer,
        }
    }

    /// True when `password` matches the configured admin password.
    pub fn check_password(&self, password: &str) -> bool {
        password == self.config.security.reset_password
    }
}
