//! # Rebill Server Binary
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize logging      tracing-subscriber, RUST_LOG overrides      │
//! │  2. Load configuration      defaults → rebill.toml → REBILL_* env       │
//! │  3. Open database           SQLite (WAL), run pending migrations        │
//! │  4. Serve                   axum on server.bind_addr:server.port        │
//! │  5. Shut down               Ctrl+C / SIGTERM, drain, close the pool     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```text
//! rebill-server [--config <path>]
//! ```

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rebill_db::{Database, DbConfig};
use rebill_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Rebill server");

    let config_path = config_path_arg(std::env::args().skip(1))?;
    let config = ServerConfig::load(config_path.as_deref())?;

    let db_path = config.database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path).max_connections(config.database.max_connections))
        .await?;

    let addr = config.socket_addr();
    let state = AppState::new(db.clone(), config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=rebill_db=trace` - Trace the database layer only
/// - Default: INFO, DEBUG for rebill crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rebill=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Reads `--config <path>` or `--config=<path>`.
fn config_path_arg<I>(args: I) -> Result<Option<PathBuf>, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args
                .next()
                .map(|p| Some(PathBuf::from(p)))
                .ok_or_else(|| "--config needs a path".to_string());
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(None)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_flag_forms() {
        assert_eq!(config_path_arg(args(&[])).unwrap(), None);
        assert_eq!(
            config_path_arg(args(&["--config", "/etc/rebill.toml"])).unwrap(),
            Some(PathBuf::from("/etc/rebill.toml"))
        );
        assert_eq!(
            config_path_arg(args(&["--config=shop.toml"])).unwrap(),
            Some(PathBuf::from("shop.toml"))
        );
        assert!(config_path_arg(args(&["--config"])).is_err());
    }
}
