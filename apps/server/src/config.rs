//! # Server Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`REBILL_*`)
//! 2. Config file (`rebill.toml`)
//! 3. Defaults (this file)
//!
//! The config file is looked up at the `--config` path, then `REBILL_CONFIG`,
//! then the platform config directory. A missing file means defaults.
//!
//! ## Example
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8000
//!
//! [database]
//! path = "/var/lib/rebill/rebill.db"
//!
//! [catalog]
//! delete_mode = "hard"
//!
//! [printer]
//! enabled = true
//! line_width = 42
//! ```
//!
//! Read-only after startup.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rebill_core::ProductDeleteMode;

const CONFIG_FILE_NAME: &str = "rebill.toml";
const DB_FILE_NAME: &str = "rebill.db";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub security: SecurityConfig,
    pub printer: PrinterConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Default: 127.0.0.1 (the frontend runs on the same machine)
    pub bind_addr: IpAddr,

    /// Default: 8000
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. `None` means the platform data directory.
    pub path: Option<PathBuf>,

    /// Default: 5
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            max_connections: 5,
        }
    }
}

/// Catalog behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// What `DELETE /products/{id}` does. Default: soft
    pub delete_mode: ProductDeleteMode,
}

/// Guards for destructive endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Password for `/reset-database` and `/bills/clear`.
    pub reset_password: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            reset_password: "admin123".to_string(),
        }
    }
}

/// Receipt printer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Whether a printer is attached. The shop can still switch printing
    /// off through the `printer_enabled` setting.
    pub enabled: bool,

    /// Paper width in characters (typically 32, 42, or 48).
    pub line_width: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        PrinterConfig {
            enabled: false,
            line_width: 32,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then the config file, then environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("REBILL_CONFIG").map(PathBuf::from))
            .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME)));

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            Some(path) if explicit_path.is_some() => {
                return Err(ConfigError::FileNotFound(path));
            }
            _ => {
                debug!("No config file, using defaults");
                ServerConfig::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies `REBILL_*` overrides.
    ///
    /// ## Environment Variables
    /// - `REBILL_BIND_ADDR`, `REBILL_PORT`
    /// - `REBILL_DB_PATH`, `REBILL_DB_MAX_CONNECTIONS`
    /// - `REBILL_DELETE_MODE` (`soft` | `hard`)
    /// - `REBILL_RESET_PASSWORD`
    /// - `REBILL_PRINTER_ENABLED`, `REBILL_PRINTER_WIDTH`
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("REBILL_BIND_ADDR") {
            self.server.bind_addr = parse_var("REBILL_BIND_ADDR", &v)?;
        }
        if let Some(v) = var("REBILL_PORT") {
            self.server.port = parse_var("REBILL_PORT", &v)?;
        }
        if let Some(v) = var("REBILL_DB_PATH") {
            self.database.path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("REBILL_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("REBILL_DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = var("REBILL_DELETE_MODE") {
            self.catalog.delete_mode = parse_var("REBILL_DELETE_MODE", &v)?;
        }
        if let Some(v) = var("REBILL_RESET_PASSWORD") {
            self.security.reset_password = v;
        }
        if let Some(v) = var("REBILL_PRINTER_ENABLED") {
            self.printer.enabled = rebill_core::settings::parse_bool(&v)
                .ok_or_else(|| ConfigError::InvalidValue("REBILL_PRINTER_ENABLED".to_string()))?;
        }
        if let Some(v) = var("REBILL_PRINTER_WIDTH") {
            self.printer.line_width = parse_var("REBILL_PRINTER_WIDTH", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.security.reset_password.is_empty() {
            return Err(ConfigError::InvalidValue("security.reset_password".to_string()));
        }
        if !(16..=80).contains(&self.printer.line_width) {
            return Err(ConfigError::InvalidValue("printer.line_width".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_addr, self.server.port)
    }

    /// Database file, creating the platform data directory when needed.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::Read {
            path: data_dir.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(data_dir.join(DB_FILE_NAME))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rebill", "rebill")
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Invalid config file: {0}")]
    Parse(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory")]
    NoDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.catalog.delete_mode, ProductDeleteMode::Soft);
        assert_eq!(config.security.reset_password, "admin123");
        assert_eq!(config.printer.line_width, 32);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            port = 9100

            [catalog]
            delete_mode = "hard"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind_addr, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.catalog.delete_mode, ProductDeleteMode::Hard);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("REBILL_PORT", "8100"),
            ("REBILL_DELETE_MODE", "HARD"),
            ("REBILL_PRINTER_ENABLED", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::from_toml("[server]\nport = 9100\n").unwrap();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 8100);
        assert_eq!(config.catalog.delete_mode, ProductDeleteMode::Hard);
        assert!(config.printer.enabled);
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(|key| (key == "REBILL_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "REBILL_PORT"));

        config.printer.line_width = 4;
        assert!(config.validate().is_err());

        assert!(matches!(
            ServerConfig::from_toml("[server]\nport = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
